//! Transport message - serialized envelope bytes plus broker attributes.

use std::collections::BTreeMap;

use crate::envelope::EnvelopeMetadata;

pub const ATTR_EVENT_ID: &str = "event-id";
pub const ATTR_EVENT_NAME: &str = "event-name";
pub const ATTR_EVENT_VERSION: &str = "event-version";
pub const ATTR_CONTENT_TYPE: &str = "content-type";

/// A message as handed to (or received from) a broker client.
///
/// `body` is the serialized envelope. Attributes duplicate the routing
/// relevant metadata so brokers can filter without parsing the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Broker-level message id (the envelope's event id on publish).
    pub id: String,
    pub body: Vec<u8>,
    pub attributes: BTreeMap<String, String>,
}

impl Message {
    /// Create a message with no attributes.
    pub fn new(id: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            body,
            attributes: BTreeMap::new(),
        }
    }

    /// Create a message for an encoded envelope, with standard attributes.
    pub fn for_envelope(meta: &EnvelopeMetadata, body: Vec<u8>, content_type: &str) -> Self {
        Self::new(meta.event_id.clone(), body)
            .with_attribute(ATTR_EVENT_ID, meta.event_id.clone())
            .with_attribute(ATTR_EVENT_NAME, meta.name.clone())
            .with_attribute(ATTR_EVENT_VERSION, meta.version.to_string())
            .with_attribute(ATTR_CONTENT_TYPE, content_type)
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|v| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.attribute(ATTR_CONTENT_TYPE)
    }

    /// Get the body as a string (if valid UTF-8).
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}
