//! Inbound envelope with an unresolved payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::metadata::EnvelopeMetadata;

/// An envelope whose payload has not been resolved to a Rust type yet.
///
/// Produced by [`JsonSerializer::deserialize`](crate::JsonSerializer::deserialize)
/// and consumed once by [`TypeRegistry::promote`](crate::TypeRegistry::promote).
/// Metadata is fully typed, so receivers can inspect it even when the
/// event name is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEnvelope {
    #[serde(default)]
    pub data: Value,
    pub meta: EnvelopeMetadata,
}

impl RawEnvelope {
    pub fn meta(&self) -> &EnvelopeMetadata {
        &self.meta
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}
