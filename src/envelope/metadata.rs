//! Envelope metadata.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transport-agnostic string headers. Ordered so encoding is deterministic.
pub type Headers = BTreeMap<String, String>;

/// Metadata carried alongside every event payload.
///
/// `(name, version)` identifies the payload schema on the wire; `type_name`
/// is the Rust type path of the producer and is kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    /// Unique per publish.
    pub event_id: String,

    /// Wire name, stable across versions.
    pub name: String,

    /// Producer-side type path.
    #[serde(rename = "type", default)]
    pub type_name: String,

    /// Schema version, starting at 1.
    #[serde(default = "first_version")]
    pub version: u32,

    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Origin service identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default)]
    pub headers: Headers,
}

fn first_version() -> u32 {
    1
}

impl EnvelopeMetadata {
    /// Fresh metadata: new event id, `occurred_at` = now.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, version: u32) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            type_name: type_name.into(),
            version,
            occurred_at: Utc::now(),
            correlation_id: None,
            causation_id: None,
            tenant_id: None,
            source: None,
            headers: Headers::new(),
        }
    }

    /// Get a header value.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }
}
