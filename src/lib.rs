mod auth;
mod config;
mod envelope;
mod error;
mod event;
mod publisher;
mod registry;
mod routing;
mod serializer;

pub mod bus;
#[cfg(feature = "http")]
pub mod push;
pub mod receiver;

pub use auth::{
    bearer_token, JwksValidator, PushAuthenticator, TokenValidator, DEFAULT_MIN_REFRESH_INTERVAL,
};
pub use config::{
    EventRoute, ExchangeOptions, PullOptions, PushOptions, TopicOptions,
    DEFAULT_ACK_DEADLINE_SECONDS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_ROUTING_KEY_TEMPLATE,
    DEFAULT_SUBSCRIBE_PATH,
};
pub use envelope::{Envelope, EnvelopeBuilder, EnvelopeMetadata, Headers, RawEnvelope};
pub use error::{
    AuthError, ConfigError, HandlerError, PublishError, RegistryError, SerializationError,
    TransportError,
};
pub use event::Event;
pub use publisher::{ExchangePublisher, PublishOptions, TopicPublisher};
pub use receiver::{Observer, Receipt, Receiver, TracingObserver};
pub use registry::{TypeRegistration, TypeRegistry};
pub use routing::{ExchangeRouting, ExchangeTarget, RoutingDecision, TopicRouting, TopicTarget};
pub use serializer::{JsonSerializer, CONTENT_TYPE_JSON};
