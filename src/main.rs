use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cardforge::cli::OutputFormat;
use cardforge::cli::commands::generate::GenerateOptions;

#[derive(Parser)]
#[command(name = "cardforge")]
#[command(
    version,
    about = "Generate reviewed study flashcards from documents with an LLM CLI"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate flashcards from a text or JSON units file
    Generate {
        #[arg(help = "Input file: form-feed paged text, or a JSON array of {index, text}")]
        input: PathBuf,
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        #[arg(short = 'c', long, help = "Card category (definition, cloze, comparison, subjective)")]
        category: Option<String>,
        #[arg(long, help = "Session key for admission control")]
        session: Option<String>,
        #[arg(long, help = "Model override")]
        model: Option<String>,
        #[arg(short = 'o', long, help = "Write the card JSON to this file")]
        output: Option<PathBuf>,
    },

    /// Show gateway capacity and memory status
    Health {
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mcardforge encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    // Logs go to stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate {
            input,
            format,
            category,
            session,
            model,
            output,
        } => {
            cardforge::cli::commands::generate::run(GenerateOptions {
                input,
                format,
                category,
                session,
                model,
                output,
                show_progress: !cli.quiet,
            })?;
        }
        Commands::Health { format } => {
            cardforge::cli::commands::health::run(format)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => {
                cardforge::cli::commands::config::show(global, format)?;
            }
            ConfigAction::Path => {
                cardforge::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                cardforge::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
