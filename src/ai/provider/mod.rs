//! Inference Provider Abstraction
//!
//! Defines the `Inference` trait: one system/user prompt pair in, one text
//! response out. The Claude CLI backend implements it directly, and the
//! gateway implements it again around a backend to add admission control.

mod claude_cli;

pub use claude_cli::{ClaudeCliBackend, normalize_output};

use async_trait::async_trait;
use std::sync::Arc;

use crate::types::Result;

/// One invocation of the external text-generation capability
#[derive(Debug, Clone, Default)]
pub struct InvokeRequest {
    /// System prompt
    pub system_instructions: String,
    /// Written to the process stdin
    pub user_content: String,
    /// Model override (falls back to the configured model)
    pub model: Option<String>,
    /// Tool permission override (falls back to the configured tools)
    pub tool_permissions: Option<String>,
    /// Per-session admission scope
    pub session_key: Option<String>,
}

impl InvokeRequest {
    pub fn new(system_instructions: impl Into<String>, user_content: impl Into<String>) -> Self {
        Self {
            system_instructions: system_instructions.into(),
            user_content: user_content.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tools(mut self, tools: impl Into<String>) -> Self {
        self.tool_permissions = Some(tools.into());
        self
    }

    pub fn with_session(mut self, session_key: Option<&str>) -> Self {
        self.session_key = session_key.map(String::from);
        self
    }
}

/// Text generation capability
#[async_trait]
pub trait Inference: Send + Sync {
    /// Run one prompt and return the normalized text response
    ///
    /// Fails with `ForgeError::Timeout` or `ForgeError::ExternalService`.
    async fn invoke(&self, request: &InvokeRequest) -> Result<String>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Shared inference handle for concurrent access across pipeline stages.
pub type SharedInference = Arc<dyn Inference>;
