//! Typed envelope and its builder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metadata::{EnvelopeMetadata, Headers};

/// A typed event payload paired with its metadata.
///
/// Immutable once built: fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    data: T,
    meta: EnvelopeMetadata,
}

impl<T> Envelope<T> {
    /// Wrap `data` with fresh metadata (new event id, `occurred_at` = now).
    pub fn new(data: T, name: impl Into<String>, version: u32) -> Self {
        Self::builder(data, name, version).build()
    }

    /// Start building an envelope with explicit metadata overrides.
    pub fn builder(data: T, name: impl Into<String>, version: u32) -> EnvelopeBuilder<T> {
        EnvelopeBuilder::new(data, name.into(), version)
    }

    /// Pair an already-resolved payload with existing metadata.
    pub(crate) fn from_parts(data: T, meta: EnvelopeMetadata) -> Self {
        Self { data, meta }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn meta(&self) -> &EnvelopeMetadata {
        &self.meta
    }

    /// Split into payload and metadata.
    pub fn into_parts(self) -> (T, EnvelopeMetadata) {
        (self.data, self.meta)
    }
}

/// Builder for [`Envelope`]. Unset fields fall back to generated defaults.
#[derive(Debug)]
pub struct EnvelopeBuilder<T> {
    data: T,
    name: String,
    version: u32,
    event_id: Option<String>,
    occurred_at: Option<DateTime<Utc>>,
    correlation_id: Option<String>,
    causation_id: Option<String>,
    tenant_id: Option<String>,
    source: Option<String>,
    headers: Headers,
}

impl<T> EnvelopeBuilder<T> {
    fn new(data: T, name: String, version: u32) -> Self {
        Self {
            data,
            name,
            version,
            event_id: None,
            occurred_at: None,
            correlation_id: None,
            causation_id: None,
            tenant_id: None,
            source: None,
            headers: Headers::new(),
        }
    }

    pub fn event_id(mut self, id: impl Into<String>) -> Self {
        self.event_id = Some(id.into());
        self
    }

    pub fn occurred_at(mut self, ts: DateTime<Utc>) -> Self {
        self.occurred_at = Some(ts);
        self
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn causation_id(mut self, id: impl Into<String>) -> Self {
        self.causation_id = Some(id.into());
        self
    }

    pub fn tenant_id(mut self, id: impl Into<String>) -> Self {
        self.tenant_id = Some(id.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Continue the causal chain of `parent`.
    ///
    /// The correlation id is inherited (or started from the parent's event id),
    /// the causation id becomes the parent's event id, and tenant is carried
    /// over unless already set.
    pub fn caused_by(mut self, parent: &EnvelopeMetadata) -> Self {
        let correlation = parent
            .correlation_id
            .clone()
            .unwrap_or_else(|| parent.event_id.clone());
        self.correlation_id = Some(correlation);
        self.causation_id = Some(parent.event_id.clone());
        if self.tenant_id.is_none() {
            self.tenant_id = parent.tenant_id.clone();
        }
        self
    }

    /// Build the envelope, generating an event id and timestamp if not supplied.
    pub fn build(self) -> Envelope<T> {
        let meta = EnvelopeMetadata {
            event_id: self
                .event_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: self.name,
            type_name: std::any::type_name::<T>().to_string(),
            version: self.version,
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
            correlation_id: self.correlation_id,
            causation_id: self.causation_id,
            tenant_id: self.tenant_id,
            source: self.source,
            headers: self.headers,
        };
        Envelope {
            data: self.data,
            meta,
        }
    }
}
