//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/cardforge/) and project (.cardforge/) level configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{gateway as gw, generation as gen_constants, network, retry};
use crate::types::{ForgeError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM CLI settings
    pub llm: LlmConfig,

    /// Admission control and resource monitoring
    pub gateway: GatewayConfig,

    /// Card generation pipeline tuning
    pub generation: GenerationConfig,

    /// Outbound alerts
    pub notify: NotifyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            gateway: GatewayConfig::default(),
            generation: GenerationConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ForgeError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.llm.command.trim().is_empty() {
            return Err(ForgeError::Config("llm.command must not be empty".to_string()));
        }

        if self.llm.timeout_secs == 0 {
            return Err(ForgeError::Config(
                "llm.timeout_secs must be greater than 0".to_string(),
            ));
        }

        self.gateway.validate()?;
        self.generation.validate()?;

        if let Some(url) = &self.notify.webhook_url {
            url::Url::parse(url).map_err(|e| {
                ForgeError::Config(format!("notify.webhook_url is not a valid URL: {}", e))
            })?;
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Executable to spawn
    pub command: String,

    /// Arguments placed before the per-call flags
    pub args: Vec<String>,

    /// Model name (omitted from the command line when unset)
    pub model: Option<String>,

    /// Per-invocation timeout in seconds
    pub timeout_secs: u64,

    /// Tool permission string passed through to the CLI
    pub tools: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            args: vec![
                "-p".to_string(),
                "--output-format".to_string(),
                "json".to_string(),
            ],
            model: Some("claude-sonnet-4-5-20250929".to_string()),
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            tools: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Gateway Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Concurrent invocations across all sessions
    pub global_concurrency: usize,

    /// Concurrent invocations within one session (must be below global)
    pub session_concurrency: usize,

    /// Low-memory alert threshold in MiB (0 disables monitoring)
    pub low_memory_mb: u64,

    /// Minimum seconds between memory samples
    pub sample_interval_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            global_concurrency: gw::GLOBAL_CONCURRENCY,
            session_concurrency: gw::SESSION_CONCURRENCY,
            low_memory_mb: gw::LOW_MEMORY_MB,
            sample_interval_secs: gw::MEMORY_SAMPLE_INTERVAL_SECS,
        }
    }
}

impl GatewayConfig {
    fn validate(&self) -> Result<()> {
        if self.session_concurrency == 0 {
            return Err(ForgeError::Config(
                "gateway.session_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.session_concurrency >= self.global_concurrency {
            return Err(ForgeError::Config(format!(
                "gateway.session_concurrency ({}) must be below global_concurrency ({})",
                self.session_concurrency, self.global_concurrency
            )));
        }
        Ok(())
    }

    pub fn low_memory_bytes(&self) -> u64 {
        self.low_memory_mb * 1024 * 1024
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }
}

// =============================================================================
// Generation Configuration
// =============================================================================

/// Pipeline tuning for chunking, retries, review and supplementing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Source units per generation request
    pub chunk_size: usize,
    /// Trailing chunks shorter than this merge backward
    pub min_chunk_chars: usize,
    /// Hard cap on returned cards
    pub max_cards: usize,
    /// Minimum accepted-status cards
    pub min_recommend: usize,
    /// Target cards per unit before clamping
    pub per_unit_target: usize,
    /// Lower bound for the yield target
    pub min_target: usize,
    /// Pass rate that ends the review loop
    pub pass_threshold: f32,
    /// Maximum review rounds
    pub max_review_rounds: usize,
    /// Total attempts per chunk
    pub max_retries: usize,
    /// Backoff schedule in seconds; the last value repeats
    pub retry_delays_secs: Vec<u64>,
    /// Rejected cards shown to the supplemental generator
    pub failed_sample_size: usize,
    /// Largest accepted document
    pub max_units: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            chunk_size: gen_constants::CHUNK_SIZE,
            min_chunk_chars: gen_constants::MIN_CHUNK_CHARS,
            max_cards: gen_constants::MAX_CARDS,
            min_recommend: gen_constants::MIN_RECOMMEND,
            per_unit_target: gen_constants::PER_UNIT_TARGET,
            min_target: gen_constants::MIN_TARGET,
            pass_threshold: gen_constants::PASS_THRESHOLD,
            max_review_rounds: gen_constants::MAX_REVIEW_ROUNDS,
            max_retries: retry::MAX_RETRIES,
            retry_delays_secs: retry::DELAYS_SECS.to_vec(),
            failed_sample_size: gen_constants::FAILED_SAMPLE_SIZE,
            max_units: gen_constants::MAX_UNITS,
        }
    }
}

impl GenerationConfig {
    fn validate(&self) -> Result<()> {
        let positive = [
            ("chunk_size", self.chunk_size),
            ("max_cards", self.max_cards),
            ("max_review_rounds", self.max_review_rounds),
            ("max_retries", self.max_retries),
            ("max_units", self.max_units),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ForgeError::Config(format!(
                    "generation.{} must be greater than 0",
                    name
                )));
            }
        }

        if self.min_target > self.max_cards {
            return Err(ForgeError::Config(format!(
                "generation.min_target ({}) exceeds max_cards ({})",
                self.min_target, self.max_cards
            )));
        }

        if !(self.pass_threshold > 0.0 && self.pass_threshold <= 1.0) {
            return Err(ForgeError::Config(format!(
                "generation.pass_threshold must be in (0.0, 1.0], got {}",
                self.pass_threshold
            )));
        }

        Ok(())
    }

    /// Yield target for a document of `unit_count` units
    pub fn target_for(&self, unit_count: usize) -> usize {
        unit_count
            .saturating_mul(self.per_unit_target)
            .max(self.min_target)
            .min(self.max_cards)
    }

    pub fn retry_delays(&self) -> Vec<Duration> {
        self.retry_delays_secs
            .iter()
            .map(|s| Duration::from_secs(*s))
            .collect()
    }
}

// =============================================================================
// Notification Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Slack-compatible incoming webhook (alerts go to the log when unset)
    pub webhook_url: Option<String>,

    /// Environment label shown in alert footers
    pub environment: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            environment: "dev".to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
