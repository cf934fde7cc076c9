//! Routing precedence: per-event override, then global default.

use std::collections::HashMap;
use std::sync::Arc;

use event_relay::bus::InMemoryBroker;
use event_relay::{
    ConfigError, EnvelopeMetadata, EventRoute, ExchangeOptions, ExchangeRouting, RoutingDecision,
    TopicOptions, TopicPublisher, TopicRouting,
};

use crate::support::{order, registry, Ping};

fn meta(name: &str, version: u32) -> EnvelopeMetadata {
    EnvelopeMetadata::new(name, name, version)
}

#[test]
fn template_applies_without_override() {
    let routing = ExchangeRouting::new(ExchangeOptions {
        routing_key_template: "evt.{name}.v{version}".into(),
        ..ExchangeOptions::default()
    })
    .unwrap();

    assert_eq!(routing.resolve(&meta("Ping", 3)).routing_key, "evt.Ping.v3");
}

#[test]
fn override_wins_regardless_of_version() {
    let routing = ExchangeRouting::new(ExchangeOptions {
        exchange: "domain".into(),
        routing_key_template: "evt.{name}.v{version}".into(),
        overrides: HashMap::from([(
            "Ping".to_string(),
            EventRoute {
                routing_key: Some("custom.ping".into()),
                mandatory: Some(true),
                ..EventRoute::default()
            },
        )]),
        ..ExchangeOptions::default()
    })
    .unwrap();

    for version in [1, 3, 9] {
        let target = routing.resolve(&meta("Ping", version));
        assert_eq!(target.routing_key, "custom.ping");
        assert_eq!(target.exchange, "domain");
        assert!(target.mandatory);
    }

    let other = routing.resolve(&meta("Pong", 2));
    assert_eq!(other.routing_key, "evt.Pong.v2");
    assert!(!other.mandatory);
}

#[test]
fn missing_global_defaults_fail_at_startup() {
    let err = ExchangeRouting::new(ExchangeOptions {
        routing_key_template: String::new(),
        ..ExchangeOptions::default()
    })
    .unwrap_err();
    assert!(matches!(err, ConfigError::RoutingConfiguration(_)));

    let err = TopicRouting::new(TopicOptions::default()).unwrap_err();
    assert!(matches!(err, ConfigError::RoutingConfiguration(_)));
}

#[test]
fn overrides_differing_only_in_case_fail_at_startup() {
    let route = EventRoute {
        routing_key: Some("ping.special".into()),
        topic_id: Some("pings".into()),
        ..EventRoute::default()
    };
    let overrides: HashMap<String, EventRoute> = [
        ("Ping".to_string(), route.clone()),
        ("ping".to_string(), route),
    ]
    .into_iter()
    .collect();

    let err = ExchangeRouting::new(ExchangeOptions {
        overrides: overrides.clone(),
        ..ExchangeOptions::default()
    })
    .unwrap_err();
    assert!(matches!(err, ConfigError::RoutingConfiguration(_)));

    let err = TopicRouting::new(TopicOptions {
        topic_id: "domain-events".into(),
        overrides,
        ..TopicOptions::default()
    })
    .unwrap_err();
    assert!(matches!(err, ConfigError::RoutingConfiguration(_)));
}

#[test]
fn topic_publisher_routes_overrides_to_their_topic() {
    let routing = TopicRouting::new(TopicOptions {
        project_id: "shop".into(),
        topic_id: "domain-events".into(),
        overrides: HashMap::from([(
            "ping".to_string(),
            EventRoute {
                topic_id: Some("heartbeats".into()),
                ..EventRoute::default()
            },
        )]),
        ..TopicOptions::default()
    })
    .unwrap();

    let broker = InMemoryBroker::new();
    let publisher = TopicPublisher::new(broker.clone(), registry(), Arc::new(routing));
    publisher.publish(order("o-1")).unwrap();
    publisher.publish(Ping { seq: 1 }).unwrap();

    assert_eq!(broker.find_by_topic("domain-events").len(), 1);
    let heartbeats = broker.find_by_topic("heartbeats");
    assert_eq!(heartbeats.len(), 1);
    match &heartbeats[0].target {
        Some(RoutingDecision::Topic(target)) => {
            assert_eq!(target.path(), "projects/shop/topics/heartbeats")
        }
        other => panic!("unexpected target {other:?}"),
    }
}

#[test]
fn options_load_from_environment_style_lookup() {
    let vars = HashMap::from([
        ("RELAY_EXCHANGE", "domain"),
        ("RELAY_ROUTING_KEY_TEMPLATE", "evt.{name}.v{version}"),
        ("RELAY_MANDATORY", "true"),
        ("RELAY_OVERRIDES", r#"{"Ping":{"routingKey":"custom.ping"}}"#),
    ]);
    let options =
        ExchangeOptions::from_lookup("RELAY", |key| vars.get(key).map(|v| v.to_string())).unwrap();

    let routing = ExchangeRouting::new(options).unwrap();
    assert_eq!(routing.resolve(&meta("Ping", 2)).routing_key, "custom.ping");
    let target = routing.resolve(&meta("Order", 1));
    assert_eq!(target.routing_key, "evt.Order.v1");
    assert_eq!(target.exchange, "domain");
    assert!(target.mandatory);
}
