//! Console progress rendering
//!
//! Draws a single status line on stderr so card JSON on stdout stays clean.

use console::style;
use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;

use crate::cards::{GenerationPhase, ProgressEvent, ProgressSink};
use crate::types::Result;

pub struct ConsoleProgress {
    started: Instant,
    last_line: Mutex<String>,
    enabled: bool,
}

impl ConsoleProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            started: Instant::now(),
            last_line: Mutex::new(String::new()),
            enabled,
        }
    }

    /// End the status line
    pub fn finish(&self) {
        if self.enabled {
            eprintln!();
        }
    }

    fn render(&self, event: &ProgressEvent) -> String {
        let elapsed = format_duration(self.started.elapsed().as_secs());
        match event.phase {
            GenerationPhase::Generating => format!(
                "{} {} {}/{} chunks ({})",
                style("Generating").cyan().bold(),
                render_progress_bar(event.completed_chunks, event.total_chunks, 30),
                event.completed_chunks,
                event.total_chunks,
                elapsed
            ),
            GenerationPhase::Reviewing => format!(
                "{} {} chunks generated ({})",
                style("Reviewing").magenta().bold(),
                event.total_chunks,
                elapsed
            ),
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&self, event: &ProgressEvent) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let line = self.render(event);
        let mut last = self
            .last_line
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *last == line {
            return Ok(());
        }

        let mut stderr = std::io::stderr().lock();
        write!(stderr, "\r\x1B[K{}", line)?;
        stderr.flush()?;
        *last = line;
        Ok(())
    }
}

fn render_progress_bar(completed: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return format!("[{}]", " ".repeat(width));
    }

    let progress = (completed as f32 / total as f32).min(1.0);
    let filled = (progress * width as f32) as usize;
    let empty = width.saturating_sub(filled);

    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_render() {
        assert_eq!(render_progress_bar(0, 4, 8), "[░░░░░░░░]");
        assert_eq!(render_progress_bar(2, 4, 8), "[████░░░░]");
        assert_eq!(render_progress_bar(4, 4, 8), "[████████]");
        assert_eq!(render_progress_bar(0, 0, 4), "[    ]");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3700), "1h 1m");
    }

    #[test]
    fn test_render_phases() {
        let progress = ConsoleProgress::new(true);
        let generating = console::strip_ansi_codes(
            &progress.render(&ProgressEvent::generating(1, 3)),
        )
        .to_string();
        assert!(generating.starts_with("Generating"));
        assert!(generating.contains("1/3 chunks"));

        let reviewing =
            console::strip_ansi_codes(&progress.render(&ProgressEvent::reviewing(3))).to_string();
        assert!(reviewing.contains("3 chunks generated"));
    }

    #[test]
    fn test_disabled_sink_accepts_events() {
        let progress = ConsoleProgress::new(false);
        assert!(progress.on_progress(&ProgressEvent::generating(0, 1)).is_ok());
    }
}
