//! Inference Gateway
//!
//! Wraps an inference backend with admission control and memory monitoring.
//! The gateway is itself an `Inference`, so pipeline stages hold a
//! `SharedInference` and never see the limits directly.

mod admission;
mod memory;

pub use admission::{AdmissionControl, AdmissionPermit};
pub use memory::{MemoryMonitor, MemoryProbe, MemorySnapshot, ProcMeminfo, parse_meminfo};

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::provider::{ClaudeCliBackend, Inference, InvokeRequest, SharedInference};
use crate::config::Config;
use crate::notify::SharedNotifier;
use crate::types::Result;

/// Capacity and memory figures for the `health` command
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    pub backend: String,
    pub global_capacity: usize,
    pub global_available: usize,
    pub session_capacity: usize,
    pub active_sessions: usize,
    pub memory: Option<MemorySnapshot>,
}

pub struct InferenceGateway {
    backend: SharedInference,
    admission: Arc<AdmissionControl>,
    memory: Option<Arc<MemoryMonitor>>,
}

impl InferenceGateway {
    pub fn new(backend: SharedInference, admission: Arc<AdmissionControl>) -> Self {
        Self {
            backend,
            admission,
            memory: None,
        }
    }

    pub fn with_memory_monitor(mut self, monitor: Arc<MemoryMonitor>) -> Self {
        self.memory = Some(monitor);
        self
    }

    /// Claude CLI backend with the configured limits and /proc/meminfo monitoring
    pub fn from_config(config: &Config, notifier: SharedNotifier) -> Self {
        let backend: SharedInference = Arc::new(ClaudeCliBackend::new(&config.llm));
        let admission = Arc::new(AdmissionControl::from_config(&config.gateway));
        let gateway = Self::new(backend, admission);

        if config.gateway.low_memory_mb == 0 {
            return gateway;
        }

        gateway.with_memory_monitor(Arc::new(MemoryMonitor::new(
            Box::new(ProcMeminfo),
            notifier,
            config.gateway.low_memory_bytes(),
            config.gateway.sample_interval(),
        )))
    }

    /// Drop the session's semaphore; call when the session's job ends
    pub fn release_session(&self, session_key: &str) {
        self.admission.release_session(session_key);
    }

    pub fn admission(&self) -> &AdmissionControl {
        &self.admission
    }

    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            backend: self.backend.name().to_string(),
            global_capacity: self.admission.global_capacity(),
            global_available: self.admission.available_global(),
            session_capacity: self.admission.session_capacity(),
            active_sessions: self.admission.active_sessions(),
            memory: self.memory.as_ref().and_then(|m| m.snapshot()),
        }
    }
}

#[async_trait]
impl Inference for InferenceGateway {
    async fn invoke(&self, request: &InvokeRequest) -> Result<String> {
        if let Some(monitor) = &self.memory {
            monitor.maybe_sample().await;
        }

        let _permit = self.admission.acquire(request.session_key.as_deref()).await?;
        debug!(
            "Admitted {} request (session={:?}, global free={})",
            self.backend.name(),
            request.session_key,
            self.admission.available_global()
        );

        self.backend.invoke(request).await
    }

    fn name(&self) -> &str {
        self.backend.name()
    }
}
