//! Publish -> wire -> receive round trips.

use std::sync::{Arc, Mutex};

use event_relay::bus::{InMemoryBroker, ATTR_EVENT_NAME, ATTR_EVENT_VERSION};
use event_relay::{
    Envelope, JsonSerializer, PublishOptions, Receipt, Receiver, CONTENT_TYPE_JSON,
};

use crate::support::{exchange_publisher, order, registry, OrderPlaced, OrderPlacedV2};

#[test]
fn metadata_survives_the_wire() {
    let envelope = Envelope::builder(order("o-1"), "OrderPlaced", 1)
        .correlation_id("corr-1")
        .causation_id("cause-1")
        .tenant_id("acme")
        .source("orders-service")
        .header("traceparent", "00-abc-def-01")
        .build();

    let bytes = JsonSerializer.serialize(&envelope).unwrap();
    let raw = JsonSerializer
        .deserialize(&bytes, Some(CONTENT_TYPE_JSON))
        .unwrap();

    assert_eq!(raw.meta(), envelope.meta());

    let typed = registry().promote::<OrderPlaced>(raw).unwrap();
    assert_eq!(typed.data(), envelope.data());
    assert_eq!(
        serde_json::to_vec(typed.data()).unwrap(),
        serde_json::to_vec(envelope.data()).unwrap()
    );
}

#[test]
fn published_message_is_received_by_typed_handler() {
    let registry = registry();
    let broker = InMemoryBroker::new();
    let publisher = exchange_publisher(&broker, registry.clone());

    let meta = publisher
        .publish_with(order("o-7"), PublishOptions::new().tenant("acme"))
        .unwrap();
    assert_eq!(meta.name, "OrderPlaced");
    assert_eq!(meta.version, 1);
    assert_eq!(meta.source.as_deref(), Some("orders-service"));

    let delivery = &broker.find_by_routing_key("evt.OrderPlaced.v1")[0];
    assert_eq!(delivery.message.attribute(ATTR_EVENT_NAME), Some("OrderPlaced"));
    assert_eq!(delivery.message.attribute(ATTR_EVENT_VERSION), Some("1"));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let receiver = Receiver::new(registry).on("record", move |e: &Envelope<OrderPlaced>| {
        sink.lock().unwrap().push(e.clone());
        Ok(())
    });

    let receipt = receiver.receive(&delivery.message.body, delivery.message.content_type());
    assert_eq!(receipt, Receipt::Handled { succeeded: 1, failed: 0 });

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].data(), &order("o-7"));
    assert_eq!(seen[0].meta(), &meta);
    assert_eq!(seen[0].meta().tenant_id.as_deref(), Some("acme"));
}

#[test]
fn versions_resolve_to_their_own_types() {
    let registry = registry();
    let broker = InMemoryBroker::new();
    let publisher = exchange_publisher(&broker, registry.clone());

    publisher.publish(order("o-1")).unwrap();
    publisher
        .publish(OrderPlacedV2 {
            order_id: "o-2".into(),
            total_cents: 500,
            currency: "EUR".into(),
        })
        .unwrap();

    let v1 = Arc::new(Mutex::new(0));
    let v2 = Arc::new(Mutex::new(Vec::new()));
    let (c1, c2) = (v1.clone(), v2.clone());
    let receiver = Receiver::new(registry)
        .on("v1", move |_: &Envelope<OrderPlaced>| {
            *c1.lock().unwrap() += 1;
            Ok(())
        })
        .on("v2", move |e: &Envelope<OrderPlacedV2>| {
            c2.lock().unwrap().push(e.data().currency.clone());
            Ok(())
        });

    for message in broker.messages() {
        assert!(receiver.receive(&message.body, message.content_type()).is_ack());
    }

    assert_eq!(*v1.lock().unwrap(), 1);
    assert_eq!(*v2.lock().unwrap(), vec!["EUR".to_string()]);
    assert_eq!(broker.find_by_routing_key("evt.OrderPlaced.v2").len(), 1);
}

#[test]
fn causal_chain_carries_across_publishes() {
    let registry = registry();
    let broker = InMemoryBroker::new();
    let publisher = exchange_publisher(&broker, registry);

    let parent = publisher.publish(order("o-1")).unwrap();
    let child = publisher
        .publish_with(order("o-2"), PublishOptions::caused_by(&parent))
        .unwrap();
    let grandchild = publisher
        .publish_with(order("o-3"), PublishOptions::caused_by(&child))
        .unwrap();

    assert_eq!(child.correlation_id.as_deref(), Some(parent.event_id.as_str()));
    assert_eq!(child.causation_id.as_deref(), Some(parent.event_id.as_str()));
    assert_eq!(grandchild.correlation_id.as_deref(), Some(parent.event_id.as_str()));
    assert_eq!(grandchild.causation_id.as_deref(), Some(child.event_id.as_str()));
}
