//! Pull loop: ack policy and cooperative shutdown.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use event_relay::bus::{InMemoryBroker, Message};
use event_relay::receiver::pull;
use event_relay::{
    ConfigError, Envelope, JsonSerializer, PullOptions, PushOptions, Receiver,
};

use crate::support::{order, registry, CountingObserver, OrderPlaced};

fn options() -> PullOptions {
    PullOptions {
        subscription_id: "orders-sub".into(),
        enable_pull_subscriber: true,
        poll_interval_ms: 5,
        ..PullOptions::default()
    }
}

fn wait_until(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
}

fn envelope_message(id: &str, name: &str, version: u32) -> Message {
    let body = JsonSerializer
        .serialize(&Envelope::new(order(id), name, version))
        .unwrap();
    Message::new(id, body)
}

#[test]
fn settles_every_message_by_outcome() {
    let observer = CountingObserver::new();
    let receiver = Arc::new(
        Receiver::new(registry())
            .with_observer(observer.clone())
            .on("fails", |_: &Envelope<OrderPlaced>| {
                Err(event_relay::HandlerError::Rejected("nope".into()))
            }),
    );

    let broker = InMemoryBroker::new();
    broker.inject(envelope_message("handled", "OrderPlaced", 1));
    broker.inject(envelope_message("unknown", "OrderShipped", 1));
    broker.inject(Message::new("garbage", b"{]".to_vec()));

    let subscriber = broker.new_subscriber();
    let settled = subscriber.clone();
    let handle = pull::spawn(receiver, subscriber, &options()).unwrap();
    assert_eq!(handle.subscription_id(), "orders-sub");

    wait_until(|| settled.acknowledged().len() + settled.rejected().len() == 3);
    let stats = handle.stop();

    assert_eq!(
        settled.acknowledged(),
        vec!["handled".to_string(), "unknown".to_string()]
    );
    let rejected = settled.rejected();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].0, "garbage");
    assert!(rejected[0].1.starts_with("malformed envelope"));

    assert_eq!(stats.handled, 1);
    assert_eq!(stats.handler_failures, 1);
    assert_eq!(stats.unregistered, 1);
    assert_eq!(stats.malformed, 1);
    assert_eq!(observer.unregistered_count(), 1);
}

#[test]
fn stop_lets_the_in_flight_handler_finish() {
    let started = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicUsize::new(0));
    let (s, f) = (started.clone(), finished.clone());
    let receiver = Arc::new(Receiver::new(registry()).on(
        "slow",
        move |_: &Envelope<OrderPlaced>| {
            s.store(true, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(150));
            f.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    ));

    let broker = InMemoryBroker::new();
    broker.inject(envelope_message("slow-1", "OrderPlaced", 1));
    broker.inject(envelope_message("slow-2", "OrderPlaced", 1));

    let subscriber = broker.new_subscriber();
    let settled = subscriber.clone();
    let handle = pull::spawn(receiver, subscriber, &options()).unwrap();

    wait_until(|| started.load(Ordering::SeqCst));
    let stats = handle.stop();

    // The first message completes and is acked; the second is never pulled.
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(settled.acknowledged(), vec!["slow-1".to_string()]);
    assert_eq!(stats.handled, 1);
}

#[test]
fn processing_past_the_ack_deadline_is_counted_and_still_settled() {
    let receiver = Arc::new(Receiver::new(registry()).on(
        "sluggish",
        |envelope: &Envelope<OrderPlaced>| {
            if envelope.data().order_id == "late" {
                thread::sleep(Duration::from_millis(1_100));
            }
            Ok(())
        },
    ));

    let broker = InMemoryBroker::new();
    broker.inject(envelope_message("late", "OrderPlaced", 1));
    broker.inject(envelope_message("prompt", "OrderPlaced", 1));

    let subscriber = broker.new_subscriber();
    let settled = subscriber.clone();
    let options = PullOptions {
        ack_deadline_seconds: 1,
        ..options()
    };
    let handle = pull::spawn(receiver, subscriber, &options).unwrap();

    wait_until(|| settled.acknowledged().len() == 2);
    let stats = handle.stop();

    assert_eq!(
        settled.acknowledged(),
        vec!["late".to_string(), "prompt".to_string()]
    );
    assert_eq!(stats.handled, 2);
    assert_eq!(stats.deadline_exceeded, 1);
}

#[test]
fn signal_stop_ends_the_loop_without_joining() {
    let receiver = Arc::new(Receiver::new(registry()));
    let broker = InMemoryBroker::new();
    let subscriber = broker.new_subscriber();
    let watcher = subscriber.clone();

    let handle = pull::spawn(receiver, subscriber, &options()).unwrap();
    handle.signal_stop();
    wait_until(|| handle.is_finished());
    assert!(handle.is_finished());
    drop(handle);

    broker.inject(envelope_message("late", "OrderPlaced", 1));
    thread::sleep(Duration::from_millis(50));
    assert!(watcher.acknowledged().is_empty());
}

#[test]
fn pull_and_push_on_one_subscription_is_rejected() {
    let push = PushOptions {
        subscription_id: Some("orders-sub".into()),
        ..PushOptions::default()
    };
    assert!(matches!(
        options().validate_against(&push),
        Err(ConfigError::InvalidValue { .. })
    ));

    let other = PushOptions {
        subscription_id: Some("payments-sub".into()),
        ..PushOptions::default()
    };
    assert!(options().validate_against(&other).is_ok());
}
