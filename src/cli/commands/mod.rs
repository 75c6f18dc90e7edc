pub mod config;
pub mod generate;
pub mod health;

/// Output format shared by the reporting commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
