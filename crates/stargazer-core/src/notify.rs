use async_trait::async_trait;

use crate::error::NotifyError;

/// Sends a text message to a destination.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError>;
}
