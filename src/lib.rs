//! cardforge - LLM Flashcard Generation Pipeline
//!
//! Turns a document, split into indexed source units, into reviewed
//! question/answer study cards by driving an external text-generation CLI.
//!
//! ## Core Features
//!
//! - **Chunked generation**: units are batched and generated concurrently,
//!   with per-chunk retry and backoff
//! - **Quality gate**: a reviewer pass removes unsupported cards, failing open
//! - **Supplementing**: deficits against the yield target are topped up
//! - **Admission control**: global and per-session process limits with
//!   low-memory alerts
//!
//! ## Quick Start
//!
//! ```ignore
//! use cardforge::{CardOrchestrator, Config, InferenceGateway};
//! use cardforge::ai::BuiltinCatalog;
//! use cardforge::notify::TracingNotifier;
//!
//! let config = Config::default();
//! let gateway = Arc::new(InferenceGateway::from_config(&config, Arc::new(TracingNotifier)));
//! let orchestrator = CardOrchestrator::new(
//!     gateway.clone(),
//!     Arc::new(BuiltinCatalog::new()),
//!     config.generation.clone(),
//! );
//! let cards = orchestrator.generate_cards(&units, "definition", Some("job-1"), None).await?;
//! gateway.release_session("job-1");
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: inference backend, gateway, prompts, output validation
//! - [`cards`]: chunking, generation, review and orchestration
//! - [`source`]: source unit suppliers
//! - [`notify`]: alert sinks
//! - [`config`]: layered configuration

pub mod ai;
pub mod cards;
pub mod cli;
pub mod config;
pub mod constants;
pub mod notify;
pub mod source;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, GenerationConfig};

// Error Types
pub use types::{ForgeError, Result, ValidationError};

// Domain
pub use types::{CandidateCard, CardStatus, RejectedCard, ReviewVerdict, SessionKey, SourceUnit};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use cards::{CardOrchestrator, ProgressEvent, ProgressSink};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{Inference, InferenceGateway, InvokeRequest, SharedInference};

// =============================================================================
// Source Re-exports
// =============================================================================

pub use source::{JsonUnitsSupplier, SourceSupplier, TextFileSupplier};
