//! Pipeline progress events

use serde::Serialize;
use std::sync::Mutex;
use tracing::warn;

use crate::types::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationPhase {
    Generating,
    Reviewing,
}

impl std::fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationPhase::Generating => write!(f, "generating"),
            GenerationPhase::Reviewing => write!(f, "reviewing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub completed_chunks: usize,
    pub total_chunks: usize,
    pub phase: GenerationPhase,
}

impl ProgressEvent {
    pub fn generating(completed_chunks: usize, total_chunks: usize) -> Self {
        Self {
            completed_chunks,
            total_chunks,
            phase: GenerationPhase::Generating,
        }
    }

    pub fn reviewing(total_chunks: usize) -> Self {
        Self {
            completed_chunks: total_chunks,
            total_chunks,
            phase: GenerationPhase::Reviewing,
        }
    }
}

/// Receives progress events, synchronously, from the orchestrator task
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent) -> Result<()>;
}

/// Deliver an event; sink failures are logged and never interrupt the job
pub(crate) fn emit(sink: Option<&dyn ProgressSink>, event: ProgressEvent) {
    if let Some(sink) = sink
        && let Err(e) = sink.on_progress(&event)
    {
        warn!("Progress sink failed on {:?}: {}", event, e);
    }
}

/// Collects every event, for tests and embedding callers
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for RecordingSink {
    fn on_progress(&self, event: &ProgressEvent) -> Result<()> {
        if let Ok(mut events) = self.events.lock() {
            events.push(*event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ForgeError;

    struct FailingSink;

    impl ProgressSink for FailingSink {
        fn on_progress(&self, _event: &ProgressEvent) -> Result<()> {
            Err(ForgeError::InvalidInput("listener gone".into()))
        }
    }

    #[test]
    fn test_emit_swallows_sink_errors() {
        emit(Some(&FailingSink), ProgressEvent::generating(0, 3));
        emit(None, ProgressEvent::reviewing(3));
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::default();
        emit(Some(&sink), ProgressEvent::generating(0, 2));
        emit(Some(&sink), ProgressEvent::reviewing(2));
        assert_eq!(
            sink.events(),
            vec![
                ProgressEvent::generating(0, 2),
                ProgressEvent {
                    completed_chunks: 2,
                    total_chunks: 2,
                    phase: GenerationPhase::Reviewing
                }
            ]
        );
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(ProgressEvent::generating(1, 4)).unwrap();
        assert_eq!(json["phase"], "generating");
        assert_eq!(json["completed_chunks"], 1);
    }
}
