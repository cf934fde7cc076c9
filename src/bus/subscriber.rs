//! Pull-side subscriber trait.

use crate::error::TransportError;

use super::Message;

/// Pull-based access to a subscription.
///
/// The pull loop calls `poll`, processes the message, then calls exactly one
/// of `ack` / `nack` for it.
pub trait Subscriber: Send + Sync {
    /// Wait up to `timeout_ms` for the next message.
    fn poll(&self, timeout_ms: u64) -> Result<Option<Message>, TransportError>;

    /// Acknowledge that a message has been processed.
    fn ack(&self, message_id: &str) -> Result<(), TransportError>;

    /// Reject a message so the broker redelivers it (or dead-letters it).
    fn nack(&self, message_id: &str, reason: &str) -> Result<(), TransportError>;
}
