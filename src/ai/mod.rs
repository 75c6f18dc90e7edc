//! AI Integration Layer
//!
//! Everything between the card pipeline and the external CLI: the inference
//! port and its CLI backend, the admission-controlled gateway, prompt
//! templates, and validation of model output.

pub mod gateway;
pub mod prompt;
pub mod provider;
pub mod timeout;
pub mod validation;

pub use gateway::{AdmissionControl, GatewayStatus, InferenceGateway, MemoryMonitor, MemorySnapshot};
pub use prompt::{BuiltinCatalog, PromptBuilder, PromptCatalog, PromptTemplates};
pub use provider::{ClaudeCliBackend, Inference, InvokeRequest, SharedInference};
pub use timeout::with_timeout;
pub use validation::{extract_json_array, parse_cards, parse_verdicts, validate_card};
