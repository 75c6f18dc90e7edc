//! Health Command
//!
//! Reports gateway capacity and available memory.

use crate::ai::gateway::{GatewayStatus, InferenceGateway};
use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::notify::TracingNotifier;
use crate::types::Result;
use std::sync::Arc;

use super::OutputFormat;

pub fn run(format: OutputFormat) -> Result<()> {
    let config = ConfigLoader::load()?;
    let gateway = InferenceGateway::from_config(&config, Arc::new(TracingNotifier));
    let status = gateway.status();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Text => print_status(&status, &config.llm.command),
    }
    Ok(())
}

fn print_status(status: &GatewayStatus, command: &str) {
    let output = Output::new();

    output.section("Gateway");
    output.field("Backend", format!("{} ({})", status.backend, command));
    output.field(
        "Global slots",
        format!("{}/{} free", status.global_available, status.global_capacity),
    );
    output.field("Per session", status.session_capacity);
    output.field("Active sessions", status.active_sessions);

    output.section("Memory");
    match &status.memory {
        Some(memory) if memory.low => output.warning(&format!(
            "{} MiB available, below the {} MiB threshold",
            memory.available_mb, memory.threshold_mb
        )),
        Some(memory) => output.success(&format!(
            "{} MiB available (threshold {} MiB)",
            memory.available_mb, memory.threshold_mb
        )),
        None => output.warning("Memory monitoring unavailable"),
    }
}
