//! Type-erased handler sets, one per event type.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::envelope::{Envelope, RawEnvelope};
use crate::error::HandlerError;
use crate::event::Event;
use crate::registry::TypeRegistry;

use super::observer::Observer;
use super::receipt::Receipt;

pub(crate) type HandlerFn<T> = Box<dyn Fn(&Envelope<T>) -> Result<(), HandlerError> + Send + Sync>;

struct NamedHandler<T> {
    name: String,
    handle: HandlerFn<T>,
}

/// Handlers registered for one concrete event type.
pub(crate) struct HandlerSet<T> {
    handlers: Vec<NamedHandler<T>>,
}

impl<T: Event> HandlerSet<T> {
    pub(crate) fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, name: &str, handle: HandlerFn<T>) {
        self.handlers.push(NamedHandler {
            name: name.to_string(),
            handle,
        });
    }
}

/// Dispatch surface shared by all `HandlerSet<T>`.
pub(crate) trait ErasedHandlers: Send + Sync {
    fn dispatch(&self, raw: RawEnvelope, registry: &TypeRegistry, observer: &dyn Observer) -> Receipt;

    fn names(&self) -> Vec<&str>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Event> ErasedHandlers for HandlerSet<T> {
    fn dispatch(&self, raw: RawEnvelope, registry: &TypeRegistry, observer: &dyn Observer) -> Receipt {
        let meta = raw.meta.clone();
        let envelope = match registry.promote::<T>(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                observer.undecodable(&meta, &e);
                return Receipt::Undecodable(e.to_string());
            }
        };

        let mut succeeded = 0;
        let mut failed = 0;
        for handler in &self.handlers {
            let outcome = catch_unwind(AssertUnwindSafe(|| (handler.handle)(&envelope)))
                .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(&*panic))));

            match outcome {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    observer.handler_failed(envelope.meta(), &handler.name, &e);
                    failed += 1;
                }
            }
        }

        Receipt::Handled { succeeded, failed }
    }

    fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name.as_str()).collect()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
