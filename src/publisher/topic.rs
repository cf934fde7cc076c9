//! Publisher for topic brokers.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::bus::TopicClient;
use crate::envelope::{Envelope, EnvelopeMetadata};
use crate::error::PublishError;
use crate::event::Event;
use crate::registry::TypeRegistry;
use crate::routing::TopicRouting;
use crate::serializer::JsonSerializer;

use super::{encode, envelope_for, wire_name, PublishOptions};

/// Publishes typed events to a topic-style broker.
pub struct TopicPublisher<C: TopicClient> {
    client: C,
    registry: Arc<TypeRegistry>,
    routing: Arc<TopicRouting>,
    serializer: JsonSerializer,
}

impl<C: TopicClient> TopicPublisher<C> {
    pub fn new(client: C, registry: Arc<TypeRegistry>, routing: Arc<TopicRouting>) -> Self {
        Self {
            client,
            registry,
            routing,
            serializer: JsonSerializer,
        }
    }

    pub fn publish<T: Event>(&self, event: T) -> Result<EnvelopeMetadata, PublishError> {
        self.publish_with(event, PublishOptions::default())
    }

    pub fn publish_with<T: Event>(
        &self,
        event: T,
        options: PublishOptions,
    ) -> Result<EnvelopeMetadata, PublishError> {
        let (name, version) = wire_name::<T>(&self.registry)?;
        self.publish_as(event, &name, version, options)
    }

    pub fn publish_as<T: Event>(
        &self,
        event: T,
        name: &str,
        version: u32,
        options: PublishOptions,
    ) -> Result<EnvelopeMetadata, PublishError> {
        let source = self.routing.options().source.as_deref();
        let envelope = envelope_for(event, name.to_string(), version, source, options);
        self.publish_envelope(&envelope)?;
        Ok(envelope.into_parts().1)
    }

    pub fn publish_envelope<T: Event>(&self, envelope: &Envelope<T>) -> Result<(), PublishError> {
        let meta = envelope.meta();
        let message = encode(&self.serializer, envelope)?;
        let target = self.routing.resolve(meta);

        self.client
            .send_to_topic(&target, message)
            .inspect(|_| {
                debug!(
                    event_id = %meta.event_id,
                    event_name = %meta.name,
                    version = meta.version,
                    topic = %target.path(),
                    "event published"
                )
            })
            .map_err(|e| {
                warn!(
                    event_id = %meta.event_id,
                    event_name = %meta.name,
                    topic = %target.path(),
                    error = %e,
                    "event publish failed"
                );
                e.into()
            })
    }

    pub fn publish_batch<T: Event>(
        &self,
        events: Vec<T>,
    ) -> Result<Vec<EnvelopeMetadata>, PublishError> {
        events.into_iter().map(|event| self.publish(event)).collect()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn routing(&self) -> &TopicRouting {
        &self.routing
    }
}
