//! Observability channel for conditions the receiver contains rather than raises.

use tracing::{error, warn};

use crate::envelope::EnvelopeMetadata;
use crate::error::{AuthError, HandlerError, RegistryError, SerializationError};

/// Receives reports of contained failures.
///
/// Every method has a default that logs through `tracing`; override the
/// ones you want to forward elsewhere (metrics, dead-letter store, tests).
pub trait Observer: Send + Sync {
    /// A well-formed envelope named an unregistered `(name, version)`.
    fn unregistered(&self, meta: &EnvelopeMetadata) {
        warn!(
            event_id = %meta.event_id,
            event_name = %meta.name,
            version = meta.version,
            source = meta.source.as_deref().unwrap_or(""),
            "unregistered event type; acknowledged without dispatch"
        );
    }

    /// The payload did not deserialize into the registered type.
    fn undecodable(&self, meta: &EnvelopeMetadata, error: &RegistryError) {
        error!(
            event_id = %meta.event_id,
            event_name = %meta.name,
            version = meta.version,
            error = %error,
            "event payload does not match registered type; acknowledged without dispatch"
        );
    }

    /// One handler failed; the others still ran.
    fn handler_failed(&self, meta: &EnvelopeMetadata, handler: &str, error: &HandlerError) {
        error!(
            event_id = %meta.event_id,
            event_name = %meta.name,
            handler,
            error = %error,
            "event handler failed"
        );
    }

    fn malformed(&self, error: &SerializationError) {
        warn!(error = %error, "malformed envelope rejected");
    }

    /// A push request failed authentication.
    fn unauthorized(&self, error: &AuthError) {
        warn!(error = %error, "push delivery failed authentication");
    }
}

/// The default observer: log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {}
