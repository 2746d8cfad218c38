use async_trait::async_trait;

use crate::Result;

/// Push-notification transport.
///
/// Only the [`DeliveryWorker`](crate::DeliveryWorker) calls `send`, one call
/// at a time. Timeouts are the implementation's business.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Publish one notification. `title` is `"[{platform}] {user}"`, `body`
    /// the UTF-8 chunk text including any `[i/N]` suffix.
    async fn send(&self, title: &str, body: &[u8]) -> Result<()>;
}
