pub mod commands;
pub mod progress;
pub mod ui;

pub use commands::OutputFormat;
pub use progress::ConsoleProgress;
