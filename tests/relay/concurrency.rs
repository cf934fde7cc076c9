//! Concurrent publishing against shared, read-only routing state.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use event_relay::bus::InMemoryBroker;

use crate::support::{exchange_publisher, registry, OrderPlaced};

const THREADS: usize = 8;
const PER_THREAD: usize = 50;

#[test]
fn concurrent_publishes_get_distinct_event_ids() {
    let broker = InMemoryBroker::new();
    let publisher = Arc::new(exchange_publisher(&broker, registry()));

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let publisher = publisher.clone();
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|i| {
                        publisher
                            .publish(OrderPlaced {
                                order_id: format!("o-{t}-{i}"),
                                total_cents: i as u64,
                            })
                            .unwrap()
                            .event_id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: Vec<String> = workers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .collect();

    let total = THREADS * PER_THREAD;
    assert_eq!(ids.len(), total);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), total);

    assert_eq!(broker.len(), total);
    assert_eq!(broker.find_by_routing_key("evt.OrderPlaced.v1").len(), total);
    let message_ids: HashSet<_> = broker.messages().into_iter().map(|m| m.id).collect();
    assert_eq!(message_ids.len(), total);
}
