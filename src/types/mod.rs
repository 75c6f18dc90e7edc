pub mod card;
pub mod error;
pub mod utils;

pub use card::{CandidateCard, CardStatus, RejectedCard, ReviewVerdict, SourceUnit, render_units};
pub use error::{ForgeError, Result, ValidationError, ValidationErrorKind};
pub use utils::{
    coerce_bool, coerce_index, coerce_tags, coerce_text, front_key, json_field, truncate_chars,
};

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;

/// Type-safe wrapper for session keys
///
/// A session key scopes per-session admission control in the inference gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random key for one-off jobs
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
