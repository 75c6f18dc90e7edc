//! Generate Command
//!
//! Supplies source units from a file, runs the card pipeline against the
//! configured CLI backend, and writes the resulting cards.
//!
//! Usage:
//!   cardforge generate notes.txt [--category cloze] [--output cards.json]

use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::{info, warn};

use super::OutputFormat;
use crate::ai::gateway::InferenceGateway;
use crate::ai::prompt::{BuiltinCatalog, DEFAULT_CATEGORY};
use crate::cards::CardOrchestrator;
use crate::cli::progress::ConsoleProgress;
use crate::cli::ui::Output;
use crate::config::{Config, ConfigLoader};
use crate::notify::{Alert, AlertLevel, notifier_from_config, notify_best_effort};
use crate::source::supplier_for;
use crate::types::{CandidateCard, CardStatus, ForgeError, Result, SessionKey, SourceUnit};

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Text (form-feed paged) or JSON units file
    pub input: PathBuf,
    pub format: OutputFormat,
    pub category: Option<String>,
    /// Admission session; a fresh key when unset
    pub session: Option<String>,
    pub model: Option<String>,
    /// JSON destination; stdout when unset
    pub output: Option<PathBuf>,
    pub show_progress: bool,
}

/// The document written for a finished job
#[derive(Debug, Serialize)]
pub struct CardDocument {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub category: String,
    pub cards: Vec<CandidateCard>,
}

pub fn run(options: GenerateOptions) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    if let Some(model) = &options.model {
        config.llm.model = Some(model.clone());
    }

    let units = supplier_for(&options.input).units()?;
    check_unit_count(&units, config.generation.max_units)?;

    let category = options
        .category
        .clone()
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let catalog = BuiltinCatalog::new();
    if !catalog.categories().contains(&category.as_str()) {
        warn!(
            "Unknown category '{}', using the {} template",
            category, DEFAULT_CATEGORY
        );
    }

    let rt = Runtime::new()?;
    let cards = rt.block_on(generate(&config, catalog, &units, &category, &options))?;

    let document = CardDocument {
        generated_at: chrono::Utc::now(),
        category,
        cards,
    };
    write_document(&document, &options)
}

/// Reject inputs before any backend invocation
fn check_unit_count(units: &[SourceUnit], max_units: usize) -> Result<()> {
    if units.is_empty() {
        return Err(ForgeError::InvalidInput(
            "input contains no text units".to_string(),
        ));
    }
    if units.len() > max_units {
        return Err(ForgeError::InvalidInput(format!(
            "input has {} units, the limit is {}",
            units.len(),
            max_units
        )));
    }
    Ok(())
}

async fn generate(
    config: &Config,
    catalog: BuiltinCatalog,
    units: &[SourceUnit],
    category: &str,
    options: &GenerateOptions,
) -> Result<Vec<CandidateCard>> {
    let notifier = notifier_from_config(&config.notify)?;
    let gateway = Arc::new(InferenceGateway::from_config(config, notifier.clone()));
    let orchestrator = CardOrchestrator::new(
        gateway.clone(),
        Arc::new(catalog),
        config.generation.clone(),
    );

    let session = options
        .session
        .clone()
        .map(SessionKey::from)
        .unwrap_or_else(SessionKey::generate);
    info!(
        "Generating {} cards from {} units (session {})",
        category,
        units.len(),
        session
    );

    let progress = ConsoleProgress::new(options.show_progress);
    let result = orchestrator
        .generate_cards(units, category, Some(session.as_str()), Some(&progress))
        .await;
    progress.finish();
    gateway.release_session(session.as_str());

    if let Err(e) = &result {
        let alert = Alert::new(AlertLevel::Error, "Card generation failed", e.to_string())
            .field("session", &session)
            .field("input", options.input.display())
            .field("units", units.len())
            .field("category", category);
        notify_best_effort(notifier.as_ref(), &alert).await;
    }
    result
}

fn write_document(document: &CardDocument, options: &GenerateOptions) -> Result<()> {
    let json = serde_json::to_string_pretty(document)?;

    if let Some(path) = &options.output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &json)?;
    }

    match options.format {
        OutputFormat::Json if options.output.is_none() => println!("{}", json),
        OutputFormat::Json => {}
        OutputFormat::Text => print_summary(document, options),
    }
    Ok(())
}

fn print_summary(document: &CardDocument, options: &GenerateOptions) {
    let output = Output::new();
    let accepted = document
        .cards
        .iter()
        .filter(|c| c.status == CardStatus::Accepted)
        .count();

    output.section(&format!("{} cards", document.category));
    for (position, card) in document.cards.iter().enumerate() {
        output.card(position, card);
    }
    println!();
    output.success(&format!(
        "{} cards ({} accepted, {} pending)",
        document.cards.len(),
        accepted,
        document.cards.len() - accepted
    ));
    if let Some(path) = &options.output {
        output.field("Written to", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_limit() {
        let units: Vec<_> = (1..=3).map(|i| SourceUnit::new(i, "text")).collect();
        assert!(check_unit_count(&units, 3).is_ok());
        assert!(matches!(
            check_unit_count(&units, 2),
            Err(ForgeError::InvalidInput(_))
        ));
        assert!(matches!(
            check_unit_count(&[], 10),
            Err(ForgeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_document_shape() {
        let document = CardDocument {
            generated_at: chrono::Utc::now(),
            category: "cloze".to_string(),
            cards: vec![CandidateCard::new("Q", "A", "E", 2, "cloze")],
        };
        let value = serde_json::to_value(&document).unwrap();
        assert!(value["generated_at"].is_string());
        assert_eq!(value["category"], "cloze");
        assert_eq!(value["cards"][0]["front"], "Q");
    }

    #[test]
    fn test_writes_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out/cards.json");
        let options = GenerateOptions {
            input: PathBuf::from("in.txt"),
            format: OutputFormat::Json,
            category: None,
            session: None,
            model: None,
            output: Some(path.clone()),
            show_progress: false,
        };
        let document = CardDocument {
            generated_at: chrono::Utc::now(),
            category: "definition".to_string(),
            cards: Vec::new(),
        };

        write_document(&document, &options).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["category"], "definition");
    }
}
