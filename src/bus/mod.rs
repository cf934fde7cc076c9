//! Bus - the seam between the relay and broker SDK clients.
//!
//! ```text
//! ┌──────────────────────────────┐        ┌──────────────────────────────┐
//! │ ExchangePublisher            │        │ TopicPublisher               │
//! │  ExchangeRouting             │        │  TopicRouting                │
//! └──────────────┬───────────────┘        └──────────────┬───────────────┘
//!                ▼                                       ▼
//!        ExchangeClient::send_to_exchange        TopicClient::send_to_topic
//!                │                                       │
//!      ┌─────────┴─────────┐                   ┌─────────┴─────────┐
//!      │ AMQP adapter      │                   │ Pub/Sub adapter   │
//!      │ (external)        │                   │ (external)        │
//!      └───────────────────┘                   └───────────────────┘
//!
//!                Subscriber::poll / ack / nack  ◄── pull loop (receiver::pull)
//! ```
//!
//! `InMemoryBroker` (feature `bus`) implements every trait here for tests
//! and single-process use.

mod client;
#[cfg(feature = "bus")]
mod in_memory_broker;
mod message;
mod subscriber;

pub use client::{ExchangeClient, TopicClient};
#[cfg(feature = "bus")]
pub use in_memory_broker::{Delivery, InMemoryBroker};
pub use message::{
    Message, ATTR_CONTENT_TYPE, ATTR_EVENT_ID, ATTR_EVENT_NAME, ATTR_EVENT_VERSION,
};
pub use subscriber::Subscriber;
