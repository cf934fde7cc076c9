//! Receiver - handler registry and dispatch for inbound envelopes.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::envelope::{Envelope, RawEnvelope};
use crate::error::HandlerError;
use crate::event::Event;
use crate::registry::TypeRegistry;
use crate::serializer::JsonSerializer;

use super::handler::{ErasedHandlers, HandlerSet};
use super::observer::{Observer, TracingObserver};
use super::receipt::Receipt;

/// Resolves inbound envelopes through the [`TypeRegistry`] and dispatches
/// them to typed handlers.
///
/// Handlers are registered at startup with the builder methods and run
/// sequentially, in registration order, for each message. A failing (or
/// panicking) handler is reported to the [`Observer`] and does not stop the
/// others.
///
/// ## Example
///
/// ```
/// # use std::sync::Arc;
/// # use serde::{Deserialize, Serialize};
/// use event_relay::{Envelope, Event, JsonSerializer, Receipt, Receiver, TypeRegistry};
///
/// #[derive(Serialize, Deserialize)]
/// struct Ping { seq: u32 }
/// impl Event for Ping {}
///
/// let registry = Arc::new(TypeRegistry::new());
/// registry.map::<Ping>("Ping").unwrap();
///
/// let receiver = Receiver::new(registry).on("log", |envelope: &Envelope<Ping>| {
///     assert_eq!(envelope.data().seq, 7);
///     Ok(())
/// });
///
/// let bytes = JsonSerializer.serialize(&Envelope::new(Ping { seq: 7 }, "Ping", 1)).unwrap();
/// assert_eq!(receiver.receive(&bytes, None), Receipt::Handled { succeeded: 1, failed: 0 });
/// ```
pub struct Receiver {
    registry: Arc<TypeRegistry>,
    serializer: JsonSerializer,
    handlers: HashMap<TypeId, Box<dyn ErasedHandlers>>,
    observer: Arc<dyn Observer>,
}

impl Receiver {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            serializer: JsonSerializer,
            handlers: HashMap::new(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the default tracing observer.
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Register a handler for `T`.
    ///
    /// `name` identifies the handler in failure reports. Uses builder
    /// pattern - returns `self` for chaining.
    pub fn on<T, F>(mut self, name: &str, handler: F) -> Self
    where
        T: Event,
        F: Fn(&Envelope<T>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        if self.registry.registration_for::<T>().is_none() {
            warn!(
                handler = name,
                type_name = std::any::type_name::<T>(),
                "handler registered for a type with no wire name; it will never be invoked until the type is mapped"
            );
        }

        let set = self
            .handlers
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(HandlerSet::<T>::new()) as Box<dyn ErasedHandlers>);
        if let Some(set) = set.as_any_mut().downcast_mut::<HandlerSet<T>>() {
            set.push(name, Box::new(handler));
        }
        self
    }

    /// Deserialize and dispatch one inbound message.
    pub fn receive(&self, body: &[u8], content_type: Option<&str>) -> Receipt {
        match self.serializer.deserialize(body, content_type) {
            Ok(raw) => self.dispatch(raw),
            Err(e) => {
                self.observer.malformed(&e);
                Receipt::Malformed(e.to_string())
            }
        }
    }

    /// Resolve and dispatch an already-deserialized envelope.
    pub fn dispatch(&self, raw: RawEnvelope) -> Receipt {
        let Some(registration) = self.registry.try_get_type(&raw.meta.name, raw.meta.version) else {
            self.observer.unregistered(&raw.meta);
            return Receipt::Unregistered {
                name: raw.meta.name,
                version: raw.meta.version,
            };
        };

        let Some(set) = self.handlers.get(&registration.type_id) else {
            debug!(
                event_id = %raw.meta.event_id,
                event_name = %raw.meta.name,
                version = raw.meta.version,
                "no handlers registered; acknowledged"
            );
            return Receipt::Handled {
                succeeded: 0,
                failed: 0,
            };
        };

        let event_id = raw.meta.event_id.clone();
        let receipt = set.dispatch(raw, &self.registry, self.observer.as_ref());
        debug!(event_id = %event_id, type_name = registration.type_name, %receipt, "event dispatched");
        receipt
    }

    /// Handler names registered for `T`, in dispatch order.
    pub fn handlers_for<T: Event>(&self) -> Vec<&str> {
        self.handlers
            .get(&TypeId::of::<T>())
            .map(|set| set.names())
            .unwrap_or_default()
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn observer(&self) -> &dyn Observer {
        self.observer.as_ref()
    }
}
