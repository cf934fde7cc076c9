//! Envelope model - metadata-wrapped event payloads.
//!
//! ```text
//! Envelope<T>   = { data: T,     meta: EnvelopeMetadata }   (outbound, typed)
//! RawEnvelope   = { data: Value, meta: EnvelopeMetadata }   (inbound, unresolved)
//! ```
//!
//! On the wire both shapes are the same JSON document:
//!
//! ```json
//! {
//!   "data": { "orderId": "o-1" },
//!   "meta": {
//!     "eventId": "6f1c...", "name": "OrderPlaced", "type": "shop::OrderPlaced",
//!     "version": 1, "occurredAt": "2026-01-01T00:00:00Z", "headers": {}
//!   }
//! }
//! ```

#[allow(clippy::module_inception)]
mod envelope;
mod metadata;
mod raw;

pub use envelope::{Envelope, EnvelopeBuilder};
pub use metadata::{EnvelopeMetadata, Headers};
pub use raw::RawEnvelope;
