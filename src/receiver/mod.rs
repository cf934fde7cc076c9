//! Receiver - inbound resolve & dispatch.
//!
//! ```text
//! bytes ─► JsonSerializer::deserialize ─► RawEnvelope
//!            │ malformed → Receipt::Malformed (nack)
//!            ▼
//!        TypeRegistry::try_get_type(name, version)
//!            │ unknown → Observer::unregistered, Receipt::Unregistered (ack)
//!            ▼
//!        promote to Envelope<T>
//!            │ payload mismatch → Observer::undecodable, Receipt::Undecodable (ack)
//!            ▼
//!        handlers for T, in registration order, each isolated
//!            │ failure → Observer::handler_failed (others still run)
//!            ▼
//!        Receipt::Handled { succeeded, failed } (ack)
//! ```
//!
//! The push endpoint (`push`, feature `http`) and the pull loop (`pull`,
//! feature `bus`) are thin drivers around [`Receiver::receive`].

mod handler;
mod observer;
mod receipt;
#[allow(clippy::module_inception)]
mod receiver;

#[cfg(feature = "bus")]
pub mod pull;

pub use observer::{Observer, TracingObserver};
pub use receipt::Receipt;
pub use receiver::Receiver;
