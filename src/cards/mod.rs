//! Card generation pipeline
//!
//! - [`chunker`]: source unit batching
//! - [`generator`]: per-chunk generation with retries
//! - [`review`]: quality gate
//! - [`supplement`]: deficit top-up generation
//! - [`orchestrator`]: the job state machine tying them together

pub mod chunker;
pub mod generator;
pub mod orchestrator;
pub mod progress;
pub mod retry;
pub mod review;
pub mod supplement;

#[cfg(test)]
pub(crate) mod test_support;

pub use chunker::{Chunk, chunk_units};
pub use generator::ChunkGenerator;
pub use orchestrator::CardOrchestrator;
pub use progress::{GenerationPhase, ProgressEvent, ProgressSink, RecordingSink};
pub use retry::RetryPolicy;
pub use review::{QualityGate, ReviewOutcome};
pub use supplement::{SupplementRequest, SupplementalGenerator};
