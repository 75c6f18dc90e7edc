//! Prompt Builder System
//!
//! Standardized prompt construction for the card pipeline.
//! Provides consistent structure across generation, review and supplement
//! prompts.
//!
//! ## Design Principles
//!
//! 1. **Role Definition**: Clear AI role for each task
//! 2. **Structured Objectives**: Numbered rules
//! 3. **Anti-Patterns**: Explicit bad examples
//! 4. **Output Schema**: JSON structure definition

use std::collections::HashMap;

use crate::types::{CandidateCard, RejectedCard, SourceUnit, render_units};

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Code block with language
    Code { language: String, content: String },
    /// Anti-patterns with good/bad examples
    AntiPatterns { bad: Vec<String>, good: Vec<String> },
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role definition section
    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    /// Add objectives section
    pub fn objectives(mut self, objectives: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.into_iter().map(String::from).collect(),
        ));
        self
    }

    /// Add text section
    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    /// Add text section with header
    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    /// Add code block
    pub fn code(mut self, language: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Code {
            language: language.to_string(),
            content: content.to_string(),
        });
        self
    }

    /// Add anti-patterns section
    pub fn anti_patterns(mut self, bad: Vec<&str>, good: Vec<&str>) -> Self {
        self.sections.push(PromptSection::AntiPatterns {
            bad: bad.into_iter().map(String::from).collect(),
            good: good.into_iter().map(String::from).collect(),
        });
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!(
                        "You are an expert {} specializing in {}.\n",
                        expertise, task
                    ));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Code { language, content } => {
                    prompt.push_str(&format!("```{}\n", language));
                    prompt.push_str(&content);
                    prompt.push_str("\n```\n\n");
                }
                PromptSection::AntiPatterns { bad, good } => {
                    prompt.push_str("## ANTI-PATTERNS\n\n");
                    prompt.push_str("<what_not_to_do>\n");
                    for example in bad {
                        prompt.push_str(&format!("WRONG: {}\n", example));
                    }
                    prompt.push_str("</what_not_to_do>\n\n");
                    prompt.push_str("<what_to_do>\n");
                    for example in good {
                        prompt.push_str(&format!("CORRECT: {}\n", example));
                    }
                    prompt.push_str("</what_to_do>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

// =============================================================================
// Category Catalog
// =============================================================================

/// Category-specific card instructions
pub trait PromptCatalog: Send + Sync {
    /// Instructions describing how cards of `category` should look
    fn system_instructions(&self, category: &str) -> String;
}

/// Category used when a requested category is unknown
pub const DEFAULT_CATEGORY: &str = "definition";

/// Built-in catalog covering definition, cloze, comparison and subjective cards
pub struct BuiltinCatalog {
    templates: HashMap<&'static str, &'static str>,
}

impl Default for BuiltinCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinCatalog {
    pub fn new() -> Self {
        let templates = HashMap::from([
            (
                "definition",
                "Create definition cards.\n\
                 - Front: \"What is X?\" or \"Define X.\"\n\
                 - Back: a concise, accurate answer in one to three sentences.",
            ),
            (
                "cloze",
                "Create cloze cards.\n\
                 - Front: a sentence from the source with one key technical term replaced by _____\n\
                 - Back: the exact term for the blank.\n\
                 - The blank must be a core term, proper noun or concept, never a filler word.\n\
                 - Exactly one answer must fit the blank, with enough context to infer it.",
            ),
            (
                "comparison",
                "Create comparison cards.\n\
                 - Front: a question contrasting two easily confused concepts (\"X vs Y?\")\n\
                 - Back: the key difference of each concept, side by side.",
            ),
            (
                "subjective",
                "Create open-answer cards.\n\
                 - Front: an essay-style prompt (\"Explain...\", \"Describe the process of...\")\n\
                 - Back: a model answer of three to five sentences that includes every key term \
                   a grader would look for.",
            ),
        ]);
        Self { templates }
    }

    /// Categories this catalog knows, sorted
    pub fn categories(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.templates.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl PromptCatalog for BuiltinCatalog {
    fn system_instructions(&self, category: &str) -> String {
        self.templates
            .get(category)
            .or_else(|| self.templates.get(DEFAULT_CATEGORY))
            .map(|t| t.to_string())
            .unwrap_or_default()
    }
}

// =============================================================================
// Pipeline Templates
// =============================================================================

const CARD_SCHEMA: &str = r#"[
  {
    "front": "question or cloze sentence",
    "back": "answer or explanation",
    "evidence": "sentence quoted verbatim from the source",
    "evidenceSourceIndex": 3,
    "tags": "type:CATEGORY, difficulty:easy|medium|hard",
    "recommended": true
  }
]"#;

const VERDICT_SCHEMA: &str = r#"[
  {"index": 0, "verdict": "pass"},
  {"index": 1, "verdict": "fail", "reason": "why the card must be removed"}
]"#;

/// Preset prompt templates for the card pipeline
pub struct PromptTemplates;

impl PromptTemplates {
    /// System prompt for card generation
    pub fn generation_system(catalog: &dyn PromptCatalog, category: &str) -> String {
        PromptBuilder::new()
            .role("exam tutor and subject professor", "study flashcards")
            .section("Card Type", &catalog.system_instructions(category))
            .objectives(vec![
                "Every card cites evidence quoted verbatim from the source, one or two sentences",
                "evidenceSourceIndex is the unit number the evidence comes from",
                "One card tests exactly one concept",
                "Write cards in the language of the source",
                "Aim for three to five cards per unit; fewer when a unit has little content",
                "Mark must-learn cards recommended=true, supplementary ones false; at least half recommended",
                "Tag difficulty as easy, medium or hard",
                "Check every card against the source before output; drop anything not supported by it",
            ])
            .anti_patterns(
                vec![
                    "Cards whose answer is not stated in the source",
                    "Cloze blanks on generic verbs or particles",
                    "Apologies or explanations instead of cards",
                ],
                vec![
                    "A card with a verbatim evidence quote and its unit number",
                    "An empty array [] when the text is incomplete or has no testable content",
                ],
            )
            .section(
                "Output Format",
                "Output ONLY a JSON array, with no prose and no markdown fences:",
            )
            .code("json", &CARD_SCHEMA.replace("CATEGORY", category))
            .build()
    }

    /// User payload for card generation
    pub fn generation_user(units: &[SourceUnit]) -> String {
        render_units(units)
    }

    /// System prompt for the quality gate
    pub fn review_system() -> String {
        PromptBuilder::new()
            .role("subject professor", "verifying study flashcards against source text")
            .objectives(vec![
                "Does the question and answer factually match the evidence?",
                "Is the answer academically accurate, without misconceptions or omissions?",
                "Does the evidence sentence actually appear in the source?",
                "Is the question unambiguous with exactly one correct answer?",
                "Was anything invented that the source does not say?",
            ])
            .text("Give a verdict for EVERY card: \"pass\" when it is sound, \"fail\" with a reason when it must be removed.")
            .section("Output Format", "Output ONLY a JSON array:")
            .code("json", VERDICT_SCHEMA)
            .build()
    }

    /// User payload for the quality gate
    pub fn review_user(source_text: &str, cards: &[CandidateCard], category: &str) -> String {
        let indexed: Vec<serde_json::Value> = cards
            .iter()
            .enumerate()
            .map(|(i, c)| {
                serde_json::json!({
                    "index": i,
                    "front": c.front,
                    "back": c.back,
                    "evidence": c.evidence,
                    "evidenceSourceIndex": c.evidence_source_index,
                })
            })
            .collect();
        let cards_json =
            serde_json::to_string_pretty(&indexed).unwrap_or_else(|_| "[]".to_string());

        PromptBuilder::new()
            .section("Source Text", source_text)
            .section(
                &format!("Cards To Review ({} cards, type: {})", cards.len(), category),
                &cards_json,
            )
            .text("Review each card against the source text and output a verdict for every card.")
            .build()
    }

    /// System prompt for supplemental generation
    pub fn supplement_system(catalog: &dyn PromptCatalog, category: &str) -> String {
        let base = Self::generation_system(catalog, category);
        PromptBuilder::new()
            .text(&base)
            .section(
                "Supplement Rules",
                "Earlier cards for this document were reviewed. Create NEW cards only: \
                 never repeat an existing front, and avoid the mistakes listed for rejected cards.",
            )
            .build()
    }

    /// User payload for supplemental generation
    pub fn supplement_user(
        units: &[SourceUnit],
        accepted_fronts: &[String],
        failed_samples: &[RejectedCard],
        deficit: usize,
    ) -> String {
        let avoid = if accepted_fronts.is_empty() {
            "(none)".to_string()
        } else {
            accepted_fronts
                .iter()
                .map(|f| format!("- {}", f))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let failures = if failed_samples.is_empty() {
            "(none)".to_string()
        } else {
            failed_samples
                .iter()
                .map(|r| format!("- {} (reason: {})", r.card.front, r.reason))
                .collect::<Vec<_>>()
                .join("\n")
        };

        PromptBuilder::new()
            .section("Source Text", &render_units(units))
            .section("Existing Cards (do not duplicate)", &avoid)
            .section("Rejected Cards (avoid these mistakes)", &failures)
            .text(&format!("Create at least {} new cards.", deficit))
            .build()
    }
}
