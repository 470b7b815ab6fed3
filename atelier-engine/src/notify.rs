//! Notification dispatch
//!
//! The concrete transport (messaging gateway) is an external collaborator;
//! the engine only knows this trait. Sends are best-effort: failures are
//! logged and never retried, and they never roll back a committed state
//! transition.

use async_trait::async_trait;

#[derive(Debug)]
pub enum NotifyError {
    Transport(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message. `Ok(false)` means the transport accepted the call
    /// but reported delivery failure.
    async fn send(&self, destination: &str, message: &str) -> Result<bool, NotifyError>;
}

/// Default transport: structured log lines. Deployments wire a real gateway
/// behind the same trait.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, destination: &str, message: &str) -> Result<bool, NotifyError> {
        tracing::info!(destination, message, "notification dispatched");
        Ok(true)
    }
}
