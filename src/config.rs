//! Startup configuration for publishers, push endpoints and pull loops.
//!
//! Option structs deserialize from camelCase JSON/TOML (the same keys the
//! environment loader understands) and are validated once, before any
//! publisher or receiver starts.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_ROUTING_KEY_TEMPLATE: &str = "{name}.v{version}";
pub const DEFAULT_SUBSCRIBE_PATH: &str = "/events/push";
pub const DEFAULT_ACK_DEADLINE_SECONDS: u64 = 60;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Per-event routing override. Unset fields fall back to the global default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRoute {
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub routing_key: Option<String>,
    #[serde(default)]
    pub mandatory: Option<bool>,
    #[serde(default)]
    pub topic_id: Option<String>,
}

/// Exchange / routing-key transports (AMQP style).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExchangeOptions {
    /// Default exchange. Empty means the broker's default exchange.
    pub exchange: String,
    /// Supports `{name}` and `{version}` placeholders.
    pub routing_key_template: String,
    pub mandatory: bool,
    /// Keyed by event name.
    pub overrides: HashMap<String, EventRoute>,
    /// Written to `meta.source` on every publish.
    pub source: Option<String>,
}

impl Default for ExchangeOptions {
    fn default() -> Self {
        Self {
            exchange: String::new(),
            routing_key_template: DEFAULT_ROUTING_KEY_TEMPLATE.to_string(),
            mandatory: false,
            overrides: HashMap::new(),
            source: None,
        }
    }
}

impl ExchangeOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.routing_key_template.trim().is_empty() {
            return Err(ConfigError::RoutingConfiguration(
                "routingKeyTemplate must not be empty".into(),
            ));
        }
        reject_case_collisions(&self.overrides)?;
        for (name, route) in &self.overrides {
            if matches!(route.routing_key.as_deref(), Some(k) if k.trim().is_empty()) {
                return Err(ConfigError::RoutingConfiguration(format!(
                    "override for {name} has an empty routingKey"
                )));
            }
        }
        Ok(())
    }

    /// Load from `<PREFIX>_EXCHANGE`, `<PREFIX>_ROUTING_KEY_TEMPLATE`,
    /// `<PREFIX>_MANDATORY`, `<PREFIX>_SOURCE` and `<PREFIX>_OVERRIDES` (JSON).
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars::new(prefix, lookup);
        let defaults = Self::default();
        let options = Self {
            exchange: vars.string("EXCHANGE").unwrap_or(defaults.exchange),
            routing_key_template: vars
                .string("ROUTING_KEY_TEMPLATE")
                .unwrap_or(defaults.routing_key_template),
            mandatory: vars.bool("MANDATORY")?.unwrap_or(defaults.mandatory),
            overrides: vars.json("OVERRIDES")?.unwrap_or_default(),
            source: vars.string("SOURCE"),
        };
        options.validate()?;
        Ok(options)
    }
}

/// Single-topic transports (Pub/Sub style).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopicOptions {
    pub project_id: String,
    pub topic_id: String,
    /// Only `topicId` is read from overrides.
    pub overrides: HashMap<String, EventRoute>,
    /// Handed to the provisioning collaborator; the relay itself never creates topics.
    pub auto_provision_topic: bool,
    pub source: Option<String>,
}

impl TopicOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topic_id.trim().is_empty() {
            return Err(ConfigError::RoutingConfiguration(
                "topicId must not be empty".into(),
            ));
        }
        reject_case_collisions(&self.overrides)?;
        for (name, route) in &self.overrides {
            if matches!(route.topic_id.as_deref(), Some(t) if t.trim().is_empty()) {
                return Err(ConfigError::RoutingConfiguration(format!(
                    "override for {name} has an empty topicId"
                )));
            }
        }
        Ok(())
    }

    /// Load from `<PREFIX>_PROJECT_ID`, `<PREFIX>_TOPIC_ID`,
    /// `<PREFIX>_AUTO_PROVISION_TOPIC`, `<PREFIX>_SOURCE` and `<PREFIX>_OVERRIDES`.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars::new(prefix, lookup);
        let options = Self {
            project_id: vars.string("PROJECT_ID").unwrap_or_default(),
            topic_id: vars.string("TOPIC_ID").unwrap_or_default(),
            overrides: vars.json("OVERRIDES")?.unwrap_or_default(),
            auto_provision_topic: vars.bool("AUTO_PROVISION_TOPIC")?.unwrap_or(false),
            source: vars.string("SOURCE"),
        };
        options.validate()?;
        Ok(options)
    }
}

/// Override names match case-insensitively, so two keys that fold to the
/// same name would make the winner depend on map order.
fn reject_case_collisions(overrides: &HashMap<String, EventRoute>) -> Result<(), ConfigError> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(overrides.len());
    for name in overrides.keys() {
        if let Some(other) = seen.insert(name.to_lowercase(), name) {
            return Err(ConfigError::RoutingConfiguration(format!(
                "overrides {other} and {name} differ only in case"
            )));
        }
    }
    Ok(())
}

/// Push endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushOptions {
    pub subscribe_path: String,
    /// Subscription delivering to this endpoint, if known.
    pub subscription_id: Option<String>,
    pub require_auth_validation: bool,
    pub audience: Option<String>,
    pub issuer: Option<String>,
    pub jwks_endpoint: Option<String>,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            subscribe_path: DEFAULT_SUBSCRIBE_PATH.to_string(),
            subscription_id: None,
            require_auth_validation: false,
            audience: None,
            issuer: None,
            jwks_endpoint: None,
        }
    }
}

impl PushOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.subscribe_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                key: "subscribePath".into(),
                reason: format!("{:?} must start with '/'", self.subscribe_path),
            });
        }
        if self.issuer.is_some() && self.jwks_endpoint.is_none() {
            return Err(ConfigError::InvalidValue {
                key: "jwksEndpoint".into(),
                reason: "required when issuer is set".into(),
            });
        }
        Ok(())
    }

    /// Whether issuer/JWKS token validation is configured.
    pub fn has_key_set_validation(&self) -> bool {
        self.jwks_endpoint.is_some()
    }

    /// Load from `<PREFIX>_SUBSCRIBE_PATH`, `<PREFIX>_SUBSCRIPTION_ID`,
    /// `<PREFIX>_REQUIRE_AUTH_VALIDATION`, `<PREFIX>_AUDIENCE`,
    /// `<PREFIX>_ISSUER` and `<PREFIX>_JWKS_ENDPOINT`.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars::new(prefix, lookup);
        let options = Self {
            subscribe_path: vars
                .string("SUBSCRIBE_PATH")
                .unwrap_or_else(|| DEFAULT_SUBSCRIBE_PATH.to_string()),
            subscription_id: vars.string("SUBSCRIPTION_ID"),
            require_auth_validation: vars.bool("REQUIRE_AUTH_VALIDATION")?.unwrap_or(false),
            audience: vars.string("AUDIENCE"),
            issuer: vars.string("ISSUER"),
            jwks_endpoint: vars.string("JWKS_ENDPOINT"),
        };
        options.validate()?;
        Ok(options)
    }
}

/// Pull subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PullOptions {
    pub subscription_id: String,
    pub enable_pull_subscriber: bool,
    pub ack_deadline_seconds: u64,
    pub poll_interval_ms: u64,
    pub auto_provision_subscription: bool,
}

impl Default for PullOptions {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            enable_pull_subscriber: false,
            ack_deadline_seconds: DEFAULT_ACK_DEADLINE_SECONDS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            auto_provision_subscription: false,
        }
    }
}

impl PullOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enable_pull_subscriber && self.subscription_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "subscriptionId".into(),
                reason: "required when the pull subscriber is enabled".into(),
            });
        }
        if self.ack_deadline_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ackDeadlineSeconds".into(),
                reason: "must be positive".into(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pollIntervalMs".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Pull and push are mutually exclusive for the same subscription.
    pub fn validate_against(&self, push: &PushOptions) -> Result<(), ConfigError> {
        self.validate()?;
        if self.enable_pull_subscriber
            && push.subscription_id.as_deref() == Some(self.subscription_id.as_str())
        {
            return Err(ConfigError::InvalidValue {
                key: "enablePullSubscriber".into(),
                reason: format!(
                    "subscription {} is already delivered to the push endpoint",
                    self.subscription_id
                ),
            });
        }
        Ok(())
    }

    pub fn ack_deadline(&self) -> Duration {
        Duration::from_secs(self.ack_deadline_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Load from `<PREFIX>_SUBSCRIPTION_ID`, `<PREFIX>_ENABLE_PULL_SUBSCRIBER`,
    /// `<PREFIX>_ACK_DEADLINE_SECONDS`, `<PREFIX>_POLL_INTERVAL_MS` and
    /// `<PREFIX>_AUTO_PROVISION_SUBSCRIPTION`.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars::new(prefix, lookup);
        let options = Self {
            subscription_id: vars.string("SUBSCRIPTION_ID").unwrap_or_default(),
            enable_pull_subscriber: vars.bool("ENABLE_PULL_SUBSCRIBER")?.unwrap_or(false),
            ack_deadline_seconds: vars
                .u64("ACK_DEADLINE_SECONDS")?
                .unwrap_or(DEFAULT_ACK_DEADLINE_SECONDS),
            poll_interval_ms: vars
                .u64("POLL_INTERVAL_MS")?
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            auto_provision_subscription: vars
                .bool("AUTO_PROVISION_SUBSCRIPTION")?
                .unwrap_or(false),
        };
        options.validate()?;
        Ok(options)
    }
}

/// Prefixed variable reader.
struct Vars<F> {
    prefix: String,
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn new(prefix: &str, lookup: F) -> Self {
        Self {
            prefix: prefix.trim_end_matches('_').to_string(),
            lookup,
        }
    }

    fn key(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}_{}", self.prefix, name)
        }
    }

    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(&self.key(name)).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Result<Option<bool>, ConfigError> {
        self.string(name)
            .map(|v| match v.to_lowercase().as_str() {
                "1" | "true" | "yes" => Ok(true),
                "0" | "false" | "no" => Ok(false),
                _ => Err(self.invalid(name, "expected a boolean")),
            })
            .transpose()
    }

    fn u64(&self, name: &str) -> Result<Option<u64>, ConfigError> {
        self.string(name)
            .map(|v| v.parse().map_err(|_| self.invalid(name, "expected an integer")))
            .transpose()
    }

    fn json<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        self.string(name)
            .map(|v| serde_json::from_str(&v).map_err(|e| self.invalid(name, &e.to_string())))
            .transpose()
    }

    fn invalid(&self, name: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.key(name),
            reason: reason.to_string(),
        }
    }
}
