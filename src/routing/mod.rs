//! Routing resolution - where an envelope goes on a given transport.
//!
//! Resolution is a pure function of envelope metadata and startup
//! configuration. It never fails per message; missing global defaults are
//! rejected when the resolver is constructed.
//!
//! ```text
//! exchange    = override.exchange    ?? options.exchange
//! routing key = override.routingKey  ?? options.routingKeyTemplate[{name}, {version}]
//! mandatory   = override.mandatory   ?? options.mandatory
//! topic       = override.topicId     ?? options.topicId
//! ```

mod exchange;
mod topic;

use std::collections::HashMap;

pub use exchange::{ExchangeRouting, ExchangeTarget};
pub use topic::{TopicRouting, TopicTarget};

use crate::config::EventRoute;

/// Transport-specific output of routing resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    Exchange(ExchangeTarget),
    Topic(TopicTarget),
}

impl From<ExchangeTarget> for RoutingDecision {
    fn from(target: ExchangeTarget) -> Self {
        RoutingDecision::Exchange(target)
    }
}

impl From<TopicTarget> for RoutingDecision {
    fn from(target: TopicTarget) -> Self {
        RoutingDecision::Topic(target)
    }
}

/// Override table keyed by case-folded event name.
#[derive(Debug, Clone, Default)]
pub(crate) struct OverrideTable {
    routes: HashMap<String, EventRoute>,
}

impl OverrideTable {
    pub(crate) fn new(routes: &HashMap<String, EventRoute>) -> Self {
        Self {
            routes: routes
                .iter()
                .map(|(name, route)| (name.to_lowercase(), route.clone()))
                .collect(),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&EventRoute> {
        self.routes.get(&name.to_lowercase())
    }
}
