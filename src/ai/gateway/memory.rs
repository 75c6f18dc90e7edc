//! Low-memory monitoring
//!
//! Every CLI invocation is a separate process, so available host memory is
//! the resource that runs out first. The monitor samples it on the invoke
//! path (rate limited) and raises one alert per low-memory episode.

use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::notify::{Alert, AlertLevel, SharedNotifier, notify_best_effort};
use crate::types::{ForgeError, Result};

const MEMINFO_PATH: &str = "/proc/meminfo";
const MIB: u64 = 1024 * 1024;

/// Source of the host's available-memory figure
pub trait MemoryProbe: Send + Sync {
    fn available_bytes(&self) -> Result<u64>;
}

/// Reads `MemAvailable` from /proc/meminfo
pub struct ProcMeminfo;

impl MemoryProbe for ProcMeminfo {
    fn available_bytes(&self) -> Result<u64> {
        let content = std::fs::read_to_string(MEMINFO_PATH)?;
        parse_meminfo(&content).ok_or_else(|| {
            ForgeError::parse(MEMINFO_PATH, "MemAvailable not found")
        })
    }
}

/// `MemAvailable` in bytes from meminfo text (values are in kB)
pub fn parse_meminfo(content: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let rest = line.strip_prefix("MemAvailable:")?;
        let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
        Some(kb * 1024)
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct MemorySnapshot {
    pub available_mb: u64,
    pub threshold_mb: u64,
    pub low: bool,
}

pub struct MemoryMonitor {
    probe: Box<dyn MemoryProbe>,
    notifier: SharedNotifier,
    threshold_bytes: u64,
    interval: Duration,
    last_sample: Mutex<Option<Instant>>,
    alerted: AtomicBool,
}

impl MemoryMonitor {
    pub fn new(
        probe: Box<dyn MemoryProbe>,
        notifier: SharedNotifier,
        threshold_bytes: u64,
        interval: Duration,
    ) -> Self {
        Self {
            probe,
            notifier,
            threshold_bytes,
            interval,
            last_sample: Mutex::new(None),
            alerted: AtomicBool::new(false),
        }
    }

    /// Sample unless the previous sample is more recent than the interval
    pub async fn maybe_sample(&self) {
        let due = {
            let mut last = self
                .last_sample
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let due = last.is_none_or(|t| t.elapsed() >= self.interval);
            if due {
                *last = Some(Instant::now());
            }
            due
        };

        if due {
            self.sample().await;
        }
    }

    /// Read available memory and alert on a new low-memory episode
    pub async fn sample(&self) -> Option<MemorySnapshot> {
        let available = match self.probe.available_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Memory probe unavailable: {}", e);
                return None;
            }
        };

        let snapshot = self.snapshot_of(available);

        if available < self.threshold_bytes {
            if !self.alerted.swap(true, Ordering::SeqCst) {
                warn!(
                    "Low memory: {} MiB available (threshold {} MiB)",
                    snapshot.available_mb, snapshot.threshold_mb
                );
                let alert = Alert::new(
                    AlertLevel::Warn,
                    "Low memory",
                    format!(
                        "{} MiB available, below the {} MiB threshold",
                        snapshot.available_mb, snapshot.threshold_mb
                    ),
                )
                .field("available_mb", snapshot.available_mb)
                .field("threshold_mb", snapshot.threshold_mb);
                notify_best_effort(self.notifier.as_ref(), &alert).await;
            }
        } else if available >= self.threshold_bytes.saturating_mul(2)
            && self.alerted.swap(false, Ordering::SeqCst)
        {
            debug!("Memory recovered to {} MiB, alert re-armed", snapshot.available_mb);
        }

        Some(snapshot)
    }

    /// Current reading without alerting
    pub fn snapshot(&self) -> Option<MemorySnapshot> {
        self.probe
            .available_bytes()
            .ok()
            .map(|available| self.snapshot_of(available))
    }

    fn snapshot_of(&self, available: u64) -> MemorySnapshot {
        MemorySnapshot {
            available_mb: available / MIB,
            threshold_mb: self.threshold_bytes / MIB,
            low: available < self.threshold_bytes,
        }
    }
}
