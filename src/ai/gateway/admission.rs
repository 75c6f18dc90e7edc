//! Two-level admission control
//!
//! A global semaphore bounds concurrent CLI processes across the whole
//! process. Per-session semaphores bound each session's share so one job
//! cannot take every global slot.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::config::GatewayConfig;
use crate::types::{ForgeError, Result};

/// Permits held for one invocation
///
/// Fields drop in declaration order: the global slot is returned before the
/// session slot, the reverse of acquisition.
#[derive(Debug)]
pub struct AdmissionPermit {
    _global: OwnedSemaphorePermit,
    _session: Option<OwnedSemaphorePermit>,
}

pub struct AdmissionControl {
    global: Arc<Semaphore>,
    global_capacity: usize,
    session_capacity: usize,
    sessions: DashMap<String, Arc<Semaphore>>,
}

impl AdmissionControl {
    pub fn new(global_capacity: usize, session_capacity: usize) -> Self {
        Self {
            global: Arc::new(Semaphore::new(global_capacity)),
            global_capacity,
            session_capacity,
            sessions: DashMap::new(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.global_concurrency, config.session_concurrency)
    }

    /// Wait for a session slot (when keyed), then a global slot
    pub async fn acquire(&self, session_key: Option<&str>) -> Result<AdmissionPermit> {
        let session = match session_key {
            Some(key) => {
                // Clone the Arc out so no map guard is held across the await
                let semaphore = self
                    .sessions
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Semaphore::new(self.session_capacity)))
                    .clone();
                Some(semaphore.acquire_owned().await.map_err(closed)?)
            }
            None => None,
        };

        let global = self.global.clone().acquire_owned().await.map_err(closed)?;

        Ok(AdmissionPermit {
            _global: global,
            _session: session,
        })
    }

    /// Forget a session's semaphore once its job is over
    ///
    /// Permits already held stay valid; a later call with the same key starts
    /// a fresh semaphore.
    pub fn release_session(&self, session_key: &str) {
        if self.sessions.remove(session_key).is_some() {
            debug!("Released session {}", session_key);
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn available_global(&self) -> usize {
        self.global.available_permits()
    }

    pub fn global_capacity(&self) -> usize {
        self.global_capacity
    }

    pub fn session_capacity(&self) -> usize {
        self.session_capacity
    }
}

fn closed(e: tokio::sync::AcquireError) -> ForgeError {
    ForgeError::ExternalService(format!("Admission semaphore closed: {}", e))
}
