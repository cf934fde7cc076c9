//! Publisher for exchange / routing-key brokers.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::bus::ExchangeClient;
use crate::envelope::{Envelope, EnvelopeMetadata};
use crate::error::PublishError;
use crate::event::Event;
use crate::registry::TypeRegistry;
use crate::routing::ExchangeRouting;
use crate::serializer::JsonSerializer;

use super::{encode, envelope_for, wire_name, PublishOptions};

/// Publishes typed events to an exchange-style broker.
///
/// ## Example
///
/// ```
/// # use std::sync::Arc;
/// # use serde::{Deserialize, Serialize};
/// use event_relay::bus::InMemoryBroker;
/// use event_relay::{Event, ExchangeOptions, ExchangePublisher, ExchangeRouting, TypeRegistry};
///
/// #[derive(Serialize, Deserialize)]
/// struct Ping { seq: u32 }
/// impl Event for Ping {}
///
/// let registry = Arc::new(TypeRegistry::new());
/// registry.map_versioned::<Ping>("Ping", 3).unwrap();
///
/// let routing = ExchangeRouting::new(ExchangeOptions {
///     routing_key_template: "evt.{name}.v{version}".into(),
///     ..Default::default()
/// }).unwrap();
///
/// let broker = InMemoryBroker::new();
/// let publisher = ExchangePublisher::new(broker.clone(), registry, Arc::new(routing));
/// publisher.publish(Ping { seq: 1 }).unwrap();
///
/// assert_eq!(broker.find_by_routing_key("evt.Ping.v3").len(), 1);
/// ```
pub struct ExchangePublisher<C: ExchangeClient> {
    client: C,
    registry: Arc<TypeRegistry>,
    routing: Arc<ExchangeRouting>,
    serializer: JsonSerializer,
}

impl<C: ExchangeClient> ExchangePublisher<C> {
    pub fn new(client: C, registry: Arc<TypeRegistry>, routing: Arc<ExchangeRouting>) -> Self {
        Self {
            client,
            registry,
            routing,
            serializer: JsonSerializer,
        }
    }

    /// Publish `event` under its registered name. Returns the envelope metadata.
    pub fn publish<T: Event>(&self, event: T) -> Result<EnvelopeMetadata, PublishError> {
        self.publish_with(event, PublishOptions::default())
    }

    /// Publish with correlation / tenant / header overrides.
    pub fn publish_with<T: Event>(
        &self,
        event: T,
        options: PublishOptions,
    ) -> Result<EnvelopeMetadata, PublishError> {
        let (name, version) = wire_name::<T>(&self.registry)?;
        self.publish_as(event, &name, version, options)
    }

    /// Publish under an explicit wire name, bypassing the registry.
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

    /// Publish a prebuilt envelope as-is.
    pub fn publish_envelope<T: Event>(&self, envelope: &Envelope<T>) -> Result<(), PublishError> {
        let meta = envelope.meta();
        let message = encode(&self.serializer, envelope)?;
        let target = self.routing.resolve(meta);

        match self.client.send_to_exchange(&target, message) {
            Ok(()) => {
                debug!(
                    event_id = %meta.event_id,
                    event_name = %meta.name,
                    version = meta.version,
                    exchange = %target.exchange,
                    routing_key = %target.routing_key,
                    mandatory = target.mandatory,
                    "event published"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    event_id = %meta.event_id,
                    event_name = %meta.name,
                    exchange = %target.exchange,
                    routing_key = %target.routing_key,
                    error = %e,
                    "event publish failed"
                );
                Err(e.into())
            }
        }
    }

    /// Publish events in order, stopping at the first failure.
    pub fn publish_batch<T: Event>(
        &self,
        events: Vec<T>,
    ) -> Result<Vec<EnvelopeMetadata>, PublishError> {
        events.into_iter().map(|event| self.publish(event)).collect()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn routing(&self) -> &ExchangeRouting {
        &self.routing
    }
}
