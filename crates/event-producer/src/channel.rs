//! The delivery channel seam between the production loop and a broker.

use crate::error::{ChannelError, DeliveryError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::time::Duration;

/// A keyed, encoded event ready for the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub payload: Vec<u8>,
}

/// Where the broker placed a delivered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub partition: i32,
    pub offset: i64,
}

/// Resolves once the broker acknowledges (or gives up on) a record.
pub type DeliveryHandle = BoxFuture<'static, Result<DeliveryReceipt, DeliveryError>>;

/// Durable, asynchronous publish path.
///
/// Implementations own acknowledgment and retry policy; callers submit a
/// record once and never re-drive it.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Enqueue a record for delivery.
    ///
    /// An `Err` means the record was never enqueued. Otherwise the handle
    /// reports the delivery outcome.
    fn send(&self, record: &Record) -> Result<DeliveryHandle, DeliveryError>;

    /// Wait until every previously enqueued record has resolved.
    async fn flush(&self, timeout: Duration) -> Result<(), ChannelError>;

    /// Release the channel's resources.
    async fn close(self) -> Result<(), ChannelError>;
}
