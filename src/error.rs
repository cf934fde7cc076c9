//! Error taxonomy for publishing, receiving and configuration.

use std::error::Error;

use thiserror::Error;

/// Errors produced while encoding or decoding envelopes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// The bytes are not a well-formed envelope, or required metadata is missing.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The inbound content type is not one the serializer understands.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// The outbound envelope could not be encoded.
    #[error("envelope encoding failed: {0}")]
    Encode(String),
}

/// Errors raised by the type registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No type is mapped under this `(name, version)` pair.
    #[error("unregistered event type: {name} v{version}")]
    UnregisteredEventType { name: String, version: u32 },

    /// The Rust type is not currently mapped to a wire name.
    #[error("type is not mapped to an event name: {0}")]
    UnmappedType(&'static str),

    /// The registered type for the pair differs from the one requested.
    #[error("{name} v{version} is registered as {registered}, not {requested}")]
    TypeMismatch {
        name: String,
        version: u32,
        registered: &'static str,
        requested: &'static str,
    },

    /// The payload does not deserialize into the registered type.
    #[error("payload for {name} v{version} does not match its type: {reason}")]
    PayloadMismatch {
        name: String,
        version: u32,
        reason: String,
    },

    /// Names must be non-empty and versions start at 1.
    #[error("invalid registration: {0}")]
    InvalidRegistration(String),
}

/// Startup-time configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required global routing default is missing.
    #[error("routing configuration error: {0}")]
    RoutingConfiguration(String),

    /// A configured value could not be parsed or is inconsistent.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Push credential failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization: Bearer` header on the request.
    #[error("missing bearer credential")]
    MissingCredential,

    /// The token failed signature, issuer, audience or expiry checks.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The remote key set could not be fetched or has no matching key.
    #[error("key set unavailable: {0}")]
    KeySetUnavailable(String),

    /// The host application's validator refused the token.
    #[error("credential rejected by custom validator")]
    Rejected,
}

/// Errors returned by a broker client adapter.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The broker refused the message (e.g. unroutable with `mandatory`).
    #[error("message rejected: {0}")]
    Rejected(String),

    /// Timed out waiting for the broker.
    #[error("transport timeout")]
    Timeout,

    #[error("transport error: {0}")]
    Other(Box<dyn Error + Send + Sync>),
}

/// Error type for publish operations.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// The event type has no wire name in the registry.
    #[error(transparent)]
    Unregistered(#[from] RegistryError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Error type returned by event handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Business logic rejected the event.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The handler could not interpret the payload.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The handler panicked; the message is the panic payload when it is a string.
    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("handler error: {0}")]
    Other(Box<dyn Error + Send + Sync>),
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        SerializationError::MalformedEnvelope(err.to_string())
    }
}
