//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Card generation pipeline constants
pub mod generation {
    /// Source units per generation request
    pub const CHUNK_SIZE: usize = 5;

    /// Trailing chunks below this many characters merge into the previous one
    pub const MIN_CHUNK_CHARS: usize = 500;

    /// Hard cap on cards returned from one job
    pub const MAX_CARDS: usize = 30;

    /// Cards guaranteed to end with accepted status (when the pool allows)
    pub const MIN_RECOMMEND: usize = 10;

    /// Target cards per source unit before clamping
    pub const PER_UNIT_TARGET: usize = 4;

    /// Lower bound for the yield target
    pub const MIN_TARGET: usize = 10;

    /// Review pass rate that ends the review loop
    pub const PASS_THRESHOLD: f32 = 0.8;

    /// Maximum review rounds (first review plus supplement rounds)
    pub const MAX_REVIEW_ROUNDS: usize = 3;

    /// Rejected cards shown to the supplemental generator
    pub const FAILED_SAMPLE_SIZE: usize = 10;

    /// Largest document accepted by the CLI
    pub const MAX_UNITS: usize = 100;
}

/// Retry constants for chunk generation
pub mod retry {
    /// Total attempts per chunk (first try + retries)
    pub const MAX_RETRIES: usize = 3;

    /// Delay schedule between attempts (seconds); the last value repeats
    pub const DELAYS_SECS: [u64; 3] = [2, 5, 10];
}

/// Inference gateway constants
pub mod gateway {
    /// Concurrent CLI processes across all sessions
    pub const GLOBAL_CONCURRENCY: usize = 3;

    /// Concurrent CLI processes per session (must be below global)
    pub const SESSION_CONCURRENCY: usize = 2;

    /// Available memory below this triggers a low-memory alert (MiB)
    pub const LOW_MEMORY_MB: u64 = 300;

    /// Minimum seconds between memory samples on the invoke path
    pub const MEMORY_SAMPLE_INTERVAL_SECS: u64 = 30;

    /// Maximum stderr characters carried in an error message
    pub const MAX_STDERR_CHARS: usize = 500;
}

/// CLI process constants
pub mod network {
    /// Default CLI invocation timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Webhook request timeout (seconds)
    pub const WEBHOOK_TIMEOUT_SECS: u64 = 5;
}
