use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One indexed segment of input text (usually a document page)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub index: u32,
    pub text: String,
}

impl SourceUnit {
    pub fn new(index: u32, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Character count (Unicode scalar values, not bytes)
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Render units as the payload shared by generation, review and supplement prompts
pub fn render_units(units: &[SourceUnit]) -> String {
    units
        .iter()
        .map(|u| format!("=== Unit {} ===\n{}", u.index, u.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardStatus::Pending => write!(f, "pending"),
            CardStatus::Accepted => write!(f, "accepted"),
            CardStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// One generated question/answer pair awaiting an acceptance decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateCard {
    pub id: Uuid,
    pub front: String,
    pub back: String,
    pub evidence: String,
    pub evidence_source_index: u32,
    pub tags: Vec<String>,
    pub category: String,
    pub recommended: bool,
    pub status: CardStatus,
}

impl CandidateCard {
    pub fn new(
        front: impl Into<String>,
        back: impl Into<String>,
        evidence: impl Into<String>,
        evidence_source_index: u32,
        category: impl Into<String>,
    ) -> Self {
        let category = category.into();
        Self {
            id: Uuid::new_v4(),
            front: front.into(),
            back: back.into(),
            evidence: evidence.into(),
            evidence_source_index,
            tags: vec![format!("type:{}", category)],
            category,
            recommended: true,
            status: CardStatus::Pending,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_recommended(mut self, recommended: bool) -> Self {
        self.recommended = recommended;
        self
    }

    /// Equality over content, ignoring the generated id
    pub fn same_content(&self, other: &CandidateCard) -> bool {
        self.front == other.front
            && self.back == other.back
            && self.evidence == other.evidence
            && self.evidence_source_index == other.evidence_source_index
            && self.tags == other.tags
            && self.category == other.category
            && self.recommended == other.recommended
            && self.status == other.status
    }
}

/// Quality gate decision for one card
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewVerdict {
    Pass,
    Fail { reason: String },
}

impl ReviewVerdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, ReviewVerdict::Pass)
    }
}

/// A card removed by the quality gate, kept with its reason for supplement prompts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedCard {
    pub card: CandidateCard,
    pub reason: String,
}
