//! Unified Error Type System
//!
//! Centralized error types for the card generation pipeline.
//!
//! ## Taxonomy
//!
//! - **Validation**: one malformed candidate card (dropped, never fatal)
//! - **Parse**: model output without a usable JSON array (retried)
//! - **ExternalService / Timeout**: process-level failures (retried)
//! - **ReviewGateway**: quality gate call failed (swallowed, fails open)
//! - **GenerationFailed**: nothing survived the pipeline (fatal)
//!
//! Per-chunk and per-round failures stay inside the pipeline. Only total
//! exhaustion reaches the caller, as a single `GenerationFailed`.

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Structured validation error for a single candidate card
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// What validation failed
    pub kind: ValidationErrorKind,
    /// Field that failed validation
    pub field: Option<String>,
    /// Detailed message
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "Validation failed for '{}': {}", field, self.message)
        } else {
            write!(f, "Validation failed: {}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            message: message.into(),
        }
    }

    /// Add field context
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Required field absent from the card object
    pub fn missing(field: &str) -> Self {
        Self::new(ValidationErrorKind::MissingField, "required field missing").with_field(field)
    }

    /// Field present but not coercible to the expected type
    pub fn format(field: &str, message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::Format, message).with_field(field)
    }
}

/// Validation error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Card is not a JSON object
    Shape,
    /// Required field missing
    MissingField,
    /// Type coercion failed
    Format,
    /// Value out of range (e.g. unknown source index)
    Range,
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ForgeError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Notification error: {0}")]
    Notification(#[from] reqwest::Error),

    // -------------------------------------------------------------------------
    // Inference Errors
    // -------------------------------------------------------------------------
    /// The external process failed or produced nothing usable
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Model output could not be parsed (recoverable by retrying)
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    /// Quality gate call failed; callers fail open
    #[error("Review gateway error: {0}")]
    ReviewGateway(String),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    Validation(ValidationError),

    #[error("Card generation failed: {0}")]
    GenerationFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<ValidationError> for ForgeError {
    fn from(err: ValidationError) -> Self {
        ForgeError::Validation(err)
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl ForgeError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a parse error
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Check if this error is transient and worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::ExternalService(_) | Self::Timeout { .. }
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
