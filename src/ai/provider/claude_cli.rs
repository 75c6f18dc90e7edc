//! Claude CLI Backend
//!
//! Runs one prompt through the local Claude CLI in print mode. The user
//! content goes through stdin, the system prompt through `--system-prompt`.
//!
//! Note: Admission control lives in the gateway and retries live in the
//! chunk generator. This backend performs single-shot execution only.

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{Inference, InvokeRequest};
use crate::ai::timeout::with_timeout;
use crate::config::LlmConfig;
use crate::constants::gateway::MAX_STDERR_CHARS;
use crate::types::{ForgeError, Result, truncate_chars};

/// Environment prefix the CLI uses to refuse nested sessions
const NESTED_SESSION_ENV_PREFIX: &str = "CLAUDECODE";

/// Claude CLI backend
pub struct ClaudeCliBackend {
    command: String,
    args: Vec<String>,
    model: Option<String>,
    tools: Option<String>,
    timeout: Duration,
}

impl ClaudeCliBackend {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            model: config.model.clone(),
            tools: config.tools.clone(),
            timeout: config.timeout(),
        }
    }

    /// Full argument list for one request
    fn build_args(&self, request: &InvokeRequest) -> Vec<String> {
        let mut args = self.args.clone();

        if !request.system_instructions.is_empty() {
            args.push("--system-prompt".to_string());
            args.push(request.system_instructions.clone());
        }

        if let Some(model) = request.model.as_ref().or(self.model.as_ref()) {
            args.push("--model".to_string());
            args.push(model.clone());
        }

        if let Some(tools) = request.tool_permissions.as_ref().or(self.tools.as_ref())
            && !tools.is_empty()
        {
            args.push("--tools".to_string());
            args.push(tools.clone());
        }

        args
    }

    /// Spawn, feed stdin, and collect output. No timeout applied here.
    async fn execute(&self, request: &InvokeRequest) -> Result<String> {
        let mut cmd = Command::new(&self.command);
        cmd.args(self.build_args(request))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, _) in std::env::vars_os() {
            if key
                .to_str()
                .is_some_and(|k| k.starts_with(NESTED_SESSION_ENV_PREFIX))
            {
                cmd.env_remove(&key);
            }
        }

        debug!(
            "Executing {} (model={:?}, input={} chars)",
            self.command,
            request.model.as_ref().or(self.model.as_ref()),
            request.user_content.chars().count()
        );

        let mut child = cmd.spawn().map_err(|e| {
            ForgeError::ExternalService(format!(
                "Failed to spawn {}: {}. Is it installed?",
                self.command, e
            ))
        })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            ForgeError::ExternalService("Child process stdin unavailable".to_string())
        })?;
        let input = request.user_content.clone().into_bytes();
        let feed = async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        if let Err(e) = fed {
            // The process may exit without draining stdin
            debug!("stdin write did not complete: {}", e);
        }
        let output = output
            .map_err(|e| ForgeError::ExternalService(format!("{} execution failed: {}", self.command, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            if let Some(message) = envelope_error(&stdout) {
                return Err(ForgeError::ExternalService(format!(
                    "{} reported an error: {}",
                    self.command, message
                )));
            }

            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                "no stderr output".to_string()
            } else {
                truncate_chars(stderr.trim(), MAX_STDERR_CHARS)
            };
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(ForgeError::ExternalService(format!(
                "{} failed (exit {}): {}",
                self.command, code, detail
            )));
        }

        debug!("{} response length: {} chars", self.command, stdout.len());
        normalize_output(&stdout)
    }
}

#[async_trait]
impl Inference for ClaudeCliBackend {
    async fn invoke(&self, request: &InvokeRequest) -> Result<String> {
        let started = Instant::now();
        let result = with_timeout(self.timeout, self.execute(request), &self.command).await;
        debug!(
            "{} finished in {}ms (ok={})",
            self.command,
            started.elapsed().as_millis(),
            result.is_ok()
        );
        result
    }

    fn name(&self) -> &str {
        "claude-cli"
    }
}

/// Error message from a JSON envelope flagged `is_error`
fn envelope_error(stdout: &str) -> Option<String> {
    let envelope: Value = serde_json::from_str(stdout.trim()).ok()?;
    if !envelope.get("is_error").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    Some(
        envelope
            .get("result")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
    )
}

/// Normalize CLI stdout into the model's text response
///
/// A JSON envelope with a string `result` yields that string. Anything else
/// (plain text, or JSON without such a field) is returned unmodified.
pub fn normalize_output(stdout: &str) -> Result<String> {
    if stdout.trim().is_empty() {
        return Err(ForgeError::ExternalService("no usable output".to_string()));
    }

    if let Some(message) = envelope_error(stdout) {
        return Err(ForgeError::ExternalService(format!(
            "CLI reported an error: {}",
            message
        )));
    }

    match serde_json::from_str::<Value>(stdout.trim()) {
        Ok(Value::Object(envelope)) => match envelope.get("result").and_then(Value::as_str) {
            Some(result) if result.trim().is_empty() => {
                Err(ForgeError::ExternalService("no usable output".to_string()))
            }
            Some(result) => Ok(result.to_string()),
            None => Ok(stdout.to_string()),
        },
        _ => Ok(stdout.to_string()),
    }
}
