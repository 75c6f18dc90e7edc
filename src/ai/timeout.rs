//! Timeout helper for async operations

use std::future::Future;
use std::time::Duration;

use crate::types::{ForgeError, Result};

/// Execute an async operation with a timeout
///
/// Returns `ForgeError::Timeout` if the operation doesn't complete within
/// `timeout`. The future is dropped on expiry, so resources it owns (such as a
/// child process spawned with `kill_on_drop`) are released immediately.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ForgeError::timeout(operation_name, timeout)),
    }
}
