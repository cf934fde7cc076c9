//! Exchange + routing-key resolution.

use crate::config::ExchangeOptions;
use crate::envelope::EnvelopeMetadata;
use crate::error::ConfigError;

use super::OverrideTable;

/// Where a message is published on an exchange-style broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeTarget {
    pub exchange: String,
    pub routing_key: String,
    /// Ask the broker to return the message if no queue is bound.
    pub mandatory: bool,
}

/// Resolves [`ExchangeTarget`]s from metadata and [`ExchangeOptions`].
///
/// ```
/// use event_relay::{EnvelopeMetadata, ExchangeOptions, ExchangeRouting};
///
/// let routing = ExchangeRouting::new(ExchangeOptions {
///     routing_key_template: "evt.{name}.v{version}".into(),
///     ..Default::default()
/// })
/// .unwrap();
///
/// let target = routing.resolve(&EnvelopeMetadata::new("Ping", "Ping", 3));
/// assert_eq!(target.routing_key, "evt.Ping.v3");
/// ```
#[derive(Debug, Clone)]
pub struct ExchangeRouting {
    options: ExchangeOptions,
    overrides: OverrideTable,
}

impl ExchangeRouting {
    /// Validate `options` and build the resolver.
    pub fn new(options: ExchangeOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        let overrides = OverrideTable::new(&options.overrides);
        Ok(Self { options, overrides })
    }

    pub fn options(&self) -> &ExchangeOptions {
        &self.options
    }

    pub fn resolve(&self, meta: &EnvelopeMetadata) -> ExchangeTarget {
        let route = self.overrides.get(&meta.name);

        let exchange = route
            .and_then(|r| r.exchange.clone())
            .unwrap_or_else(|| self.options.exchange.clone());

        let routing_key = route
            .and_then(|r| r.routing_key.clone())
            .unwrap_or_else(|| render_template(&self.options.routing_key_template, meta));

        let mandatory = route
            .and_then(|r| r.mandatory)
            .unwrap_or(self.options.mandatory);

        ExchangeTarget {
            exchange,
            routing_key,
            mandatory,
        }
    }
}

/// Literal, case-sensitive placeholder substitution.
fn render_template(template: &str, meta: &EnvelopeMetadata) -> String {
    template
        .replace("{name}", &meta.name)
        .replace("{version}", &meta.version.to_string())
}
