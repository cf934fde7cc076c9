//! Publishers - typed event in, routed transport message out.
//!
//! Both publishers follow the same pipeline:
//!
//! 1. name the event (`TypeRegistry::name_of`, or an explicit `publish_as`)
//! 2. build an [`Envelope`] (fresh event id, `occurred_at`, options merged in)
//! 3. serialize it with [`JsonSerializer`]
//! 4. resolve the transport target from the envelope metadata
//! 5. hand the [`Message`] to the broker client
//!
//! Publishers hold only shared, read-only state and can be called from many
//! threads concurrently.

mod exchange;
mod topic;

pub use exchange::ExchangePublisher;
pub use topic::TopicPublisher;

use crate::bus::Message;
use crate::envelope::{Envelope, EnvelopeMetadata, Headers};
use crate::error::PublishError;
use crate::event::Event;
use crate::registry::TypeRegistry;
use crate::serializer::JsonSerializer;

/// Per-publish metadata overrides.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub correlation_id: Option<String>,
    pub causation_id: Option<String>,
    pub tenant_id: Option<String>,
    pub headers: Headers,
}

impl PublishOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options continuing the causal chain of `parent`
    /// (see [`EnvelopeBuilder::caused_by`](crate::EnvelopeBuilder::caused_by)).
    pub fn caused_by(parent: &EnvelopeMetadata) -> Self {
        Self {
            correlation_id: Some(
                parent
                    .correlation_id
                    .clone()
                    .unwrap_or_else(|| parent.event_id.clone()),
            ),
            causation_id: Some(parent.event_id.clone()),
            tenant_id: parent.tenant_id.clone(),
            headers: Headers::new(),
        }
    }

    pub fn tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Build the envelope for `event` under `(name, version)`.
pub(crate) fn envelope_for<T: Event>(
    event: T,
    name: String,
    version: u32,
    source: Option<&str>,
    options: PublishOptions,
) -> Envelope<T> {
    let mut builder = Envelope::builder(event, name, version).headers(options.headers);
    if let Some(id) = options.correlation_id {
        builder = builder.correlation_id(id);
    }
    if let Some(id) = options.causation_id {
        builder = builder.causation_id(id);
    }
    if let Some(id) = options.tenant_id {
        builder = builder.tenant_id(id);
    }
    if let Some(source) = source {
        builder = builder.source(source);
    }
    builder.build()
}

/// Look up the wire name for `T`.
pub(crate) fn wire_name<T: Event>(registry: &TypeRegistry) -> Result<(String, u32), PublishError> {
    Ok(registry.name_of::<T>()?)
}

/// Serialize an envelope into a transport message.
pub(crate) fn encode<T: Event>(
    serializer: &JsonSerializer,
    envelope: &Envelope<T>,
) -> Result<Message, PublishError> {
    let body = serializer.serialize(envelope)?;
    Ok(Message::for_envelope(
        envelope.meta(),
        body,
        serializer.content_type(),
    ))
}
