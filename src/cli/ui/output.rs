use console::style;

use crate::types::{CandidateCard, CardStatus};

/// Styled human-readable output for the CLI commands
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<20} {}", style(label).dim(), value);
    }

    pub fn card(&self, position: usize, card: &CandidateCard) {
        let status = match card.status {
            CardStatus::Accepted => style("accepted").green(),
            CardStatus::Pending => style("pending").yellow(),
            CardStatus::Rejected => style("rejected").red(),
        };
        println!(
            "\n{} [{}] {}",
            style(format!("#{}", position + 1)).bold(),
            status,
            card.front
        );
        println!("   {}", card.back);
        println!(
            "   {}",
            style(format!("unit {}: {}", card.evidence_source_index, card.evidence)).dim()
        );
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
