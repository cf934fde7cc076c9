//! JSON wire format for envelopes.
//!
//! Serialization is typed; deserialization stops at [`RawEnvelope`] because
//! the serializer has no access to the registry. Resolution to a concrete
//! type happens later, in the receiver.

use serde::Serialize;
use serde_json::Value;

use crate::envelope::{Envelope, RawEnvelope};
use crate::error::SerializationError;

/// Content type written on outbound messages.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Encodes envelopes as `{ "data": ..., "meta": { ... } }` JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE_JSON
    }

    /// Encode a typed envelope. Headers are ordered, so equal envelopes
    /// always encode to equal bytes.
    pub fn serialize<T: Serialize>(&self, envelope: &Envelope<T>) -> Result<Vec<u8>, SerializationError> {
        serde_json::to_vec(envelope).map_err(|e| SerializationError::Encode(e.to_string()))
    }

    /// Parse bytes into metadata plus an untyped payload.
    ///
    /// `content_type` may be `None` (assume JSON) or any `*/json` / `*+json`
    /// media type, parameters ignored. `meta.name` and `meta.eventId` must be
    /// present and non-empty; `meta.version` must be at least 1.
    pub fn deserialize(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<RawEnvelope, SerializationError> {
        if let Some(content_type) = content_type {
            if !is_json_media_type(content_type) {
                return Err(SerializationError::UnsupportedContentType(
                    content_type.to_string(),
                ));
            }
        }

        let value: Value = serde_json::from_slice(bytes)?;
        let meta = value
            .get("meta")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed("missing meta object"))?;

        for field in ["name", "eventId"] {
            match meta.get(field).and_then(Value::as_str) {
                Some(s) if !s.trim().is_empty() => {}
                _ => return Err(malformed(&format!("missing meta.{field}"))),
            }
        }

        let raw: RawEnvelope = serde_json::from_value(value)?;
        if raw.meta.version == 0 {
            return Err(malformed("meta.version must be at least 1"));
        }
        Ok(raw)
    }
}

fn malformed(reason: &str) -> SerializationError {
    SerializationError::MalformedEnvelope(reason.to_string())
}

fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.ends_with("/json") || essence.ends_with("+json")
}
