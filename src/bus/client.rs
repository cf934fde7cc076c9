//! Broker client traits implemented by SDK adapters.

use crate::error::TransportError;
use crate::routing::{ExchangeTarget, TopicTarget};

use super::Message;

/// Client for exchange / routing-key brokers.
///
/// Implementations wrap an AMQP channel (or similar) and perform the actual
/// basic-publish. They must be safe to call from many threads at once.
pub trait ExchangeClient: Send + Sync {
    fn send_to_exchange(&self, target: &ExchangeTarget, message: Message) -> Result<(), TransportError>;
}

/// Client for topic brokers.
pub trait TopicClient: Send + Sync {
    fn send_to_topic(&self, target: &TopicTarget, message: Message) -> Result<(), TransportError>;
}

impl<C: ExchangeClient + ?Sized> ExchangeClient for std::sync::Arc<C> {
    fn send_to_exchange(&self, target: &ExchangeTarget, message: Message) -> Result<(), TransportError> {
        (**self).send_to_exchange(target, message)
    }
}

impl<C: TopicClient + ?Sized> TopicClient for std::sync::Arc<C> {
    fn send_to_topic(&self, target: &TopicTarget, message: Message) -> Result<(), TransportError> {
        (**self).send_to_topic(target, message)
    }
}
