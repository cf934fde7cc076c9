//! Pub/Sub style push wrapper.
//!
//! ```json
//! { "message": { "data": "<base64>", "messageId": "...", "attributes": {} },
//!   "subscription": "projects/p/subscriptions/s" }
//! ```
//!
//! Bodies without a `message` object are taken to be a bare envelope.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::bus::ATTR_CONTENT_TYPE;
use crate::error::SerializationError;

#[derive(Debug, Deserialize)]
struct PushRequest {
    message: PushMessage,
    #[serde(default)]
    subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushMessage {
    #[serde(default)]
    data: String,
    #[serde(default, alias = "message_id")]
    message_id: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

/// The envelope bytes carried by one push request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushDelivery {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub message_id: Option<String>,
    pub subscription: Option<String>,
}

/// Unwrap a push body. `content_type` is the request's header and applies
/// only to bare envelopes.
pub fn unwrap_push_body(
    body: &[u8],
    content_type: Option<&str>,
) -> Result<PushDelivery, SerializationError> {
    let bare = || PushDelivery {
        body: body.to_vec(),
        content_type: content_type.map(str::to_string),
        message_id: None,
        subscription: None,
    };

    let is_wrapper = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .is_some_and(|value| value.get("message").is_some_and(|m| m.is_object()));
    if !is_wrapper {
        return Ok(bare());
    }

    let request: PushRequest = serde_json::from_slice(body)?;
    let data = STANDARD
        .decode(request.message.data.trim())
        .map_err(|e| SerializationError::MalformedEnvelope(format!("push data is not base64: {e}")))?;

    Ok(PushDelivery {
        body: data,
        content_type: request.message.attributes.get(ATTR_CONTENT_TYPE).cloned(),
        message_id: request.message.message_id,
        subscription: request.subscription,
    })
}
