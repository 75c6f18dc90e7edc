//! Config Command
//!
//! Manage cardforge configuration.
//!
//! Usage:
//!   cardforge config show [-g] [-f json]
//!   cardforge config path
//!   cardforge config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

use super::OutputFormat;

/// Show configuration
pub fn show(global: bool, format: OutputFormat) -> Result<()> {
    if !global {
        // Merged effective config
        let config = ConfigLoader::load()?;
        println!("{}", ConfigLoader::render(&config, format == OutputFormat::Json)?);
        return Ok(());
    }

    let Some(global_path) = ConfigLoader::global_config_path() else {
        println!("Cannot determine global config directory.");
        return Ok(());
    };

    if global_path.exists() {
        let content = std::fs::read_to_string(&global_path)?;
        println!("# Global Config: {}\n", global_path.display());
        println!("{}", content);
    } else {
        println!("No global config found.");
        println!("Run 'cardforge config init --global' to create one.");
    }
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    let output = Output::new();
    output.section("Configuration paths");
    for (label, path) in ConfigLoader::config_paths() {
        match path {
            Some(path) => {
                let mark = if path.exists() { "✓" } else { "✗" };
                output.field(label, format!("{} {}", mark, path.display()));
            }
            None => output.field(label, "(not available)"),
        }
    }
    Ok(())
}

pub fn init(global: bool, force: bool) -> Result<()> {
    let output = Output::new();
    let config_path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };

    // An existing file is kept unless forced; make sure it still validates
    ConfigLoader::load_from_file(&config_path)?;

    output.success(&format!(
        "Initialized {} configuration",
        if global { "global" } else { "project" }
    ));
    output.field("Config", config_path.display());
    Ok(())
}
