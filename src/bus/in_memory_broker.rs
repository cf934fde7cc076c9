//! In-memory broker for testing and single-process scenarios.
//!
//! Implements `ExchangeClient`, `TopicClient` and `Subscriber`, keeping every
//! delivery (with its resolved routing target) in a shared append-only log:
//! - Thread-safe (clones share the log)
//! - Each subscriber created with `new_subscriber()` tracks its own position
//! - Acks and nacks are recorded per subscriber

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use crate::error::TransportError;
use crate::routing::{ExchangeTarget, RoutingDecision, TopicTarget};

use super::{ExchangeClient, Message, Subscriber, TopicClient};

/// One message as the broker received it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// `None` for messages injected directly with [`InMemoryBroker::inject`].
    pub target: Option<RoutingDecision>,
    pub message: Message,
}

/// In-memory broker.
///
/// ```
/// use event_relay::bus::{InMemoryBroker, Message, Subscriber, TopicClient};
/// use event_relay::TopicTarget;
///
/// let broker = InMemoryBroker::new();
/// let target = TopicTarget { project_id: "acme".into(), topic_id: "events".into() };
/// broker.send_to_topic(&target, Message::new("m-1", b"{}".to_vec())).unwrap();
///
/// let subscriber = broker.new_subscriber();
/// assert_eq!(subscriber.poll(10).unwrap().unwrap().id, "m-1");
/// assert!(subscriber.poll(10).unwrap().is_none());
/// ```
#[derive(Clone)]
pub struct InMemoryBroker {
    /// Shared delivery log
    log: Arc<RwLock<Vec<Delivery>>>,
    /// Per-subscriber read position
    position: Arc<Mutex<usize>>,
    acked: Arc<Mutex<Vec<String>>>,
    nacked: Arc<Mutex<Vec<(String, String)>>>,
    /// When set, every send is refused with this reason
    refuse: Arc<Mutex<Option<String>>>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self {
            log: Arc::new(RwLock::new(Vec::new())),
            position: Arc::new(Mutex::new(0)),
            acked: Arc::new(Mutex::new(Vec::new())),
            nacked: Arc::new(Mutex::new(Vec::new())),
            refuse: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a subscriber that shares the log but has its own position and
    /// ack bookkeeping.
    pub fn new_subscriber(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
            position: Arc::new(Mutex::new(0)),
            acked: Arc::new(Mutex::new(Vec::new())),
            nacked: Arc::new(Mutex::new(Vec::new())),
            refuse: Arc::clone(&self.refuse),
        }
    }

    /// Append a message without routing, e.g. bytes from a foreign producer.
    pub fn inject(&self, message: Message) {
        write(&self.log).push(Delivery {
            target: None,
            message,
        });
    }

    /// Refuse all subsequent sends (`Some(reason)`) or accept them again (`None`).
    pub fn refuse_sends(&self, reason: Option<&str>) {
        *lock(&self.refuse) = reason.map(str::to_string);
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        read(&self.log).clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        read(&self.log).iter().map(|d| d.message.clone()).collect()
    }

    pub fn len(&self) -> usize {
        read(&self.log).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.log).is_empty()
    }

    /// Deliveries routed to the given routing key.
    pub fn find_by_routing_key(&self, routing_key: &str) -> Vec<Delivery> {
        read(&self.log)
            .iter()
            .filter(|d| {
                matches!(&d.target, Some(RoutingDecision::Exchange(t)) if t.routing_key == routing_key)
            })
            .cloned()
            .collect()
    }

    /// Deliveries sent to the given topic id.
    pub fn find_by_topic(&self, topic_id: &str) -> Vec<Delivery> {
        read(&self.log)
            .iter()
            .filter(|d| matches!(&d.target, Some(RoutingDecision::Topic(t)) if t.topic_id == topic_id))
            .cloned()
            .collect()
    }

    pub fn current_position(&self) -> usize {
        *lock(&self.position)
    }

    pub fn reset_position(&self) {
        *lock(&self.position) = 0;
    }

    pub fn acknowledged(&self) -> Vec<String> {
        lock(&self.acked).clone()
    }

    /// `(message id, reason)` pairs.
    pub fn rejected(&self) -> Vec<(String, String)> {
        lock(&self.nacked).clone()
    }

    /// Clear all deliveries (useful for test cleanup).
    pub fn clear(&self) {
        write(&self.log).clear();
        *lock(&self.position) = 0;
        lock(&self.acked).clear();
        lock(&self.nacked).clear();
    }

    fn record(&self, target: RoutingDecision, message: Message) -> Result<(), TransportError> {
        if let Some(reason) = lock(&self.refuse).clone() {
            return Err(TransportError::Rejected(reason));
        }
        write(&self.log).push(Delivery {
            target: Some(target),
            message,
        });
        Ok(())
    }
}

impl ExchangeClient for InMemoryBroker {
    fn send_to_exchange(&self, target: &ExchangeTarget, message: Message) -> Result<(), TransportError> {
        self.record(target.clone().into(), message)
    }
}

impl TopicClient for InMemoryBroker {
    fn send_to_topic(&self, target: &TopicTarget, message: Message) -> Result<(), TransportError> {
        self.record(target.clone().into(), message)
    }
}

impl Subscriber for InMemoryBroker {
    fn poll(&self, timeout_ms: u64) -> Result<Option<Message>, TransportError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            {
                let log = read(&self.log);
                let mut pos = lock(&self.position);

                if *pos < log.len() {
                    let message = log[*pos].message.clone();
                    *pos += 1;
                    return Ok(Some(message));
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }

            // Small sleep to avoid busy-waiting
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn ack(&self, message_id: &str) -> Result<(), TransportError> {
        lock(&self.acked).push(message_id.to_string());
        Ok(())
    }

    fn nack(&self, message_id: &str, reason: &str) -> Result<(), TransportError> {
        // No redelivery here; the message stays in the log
        lock(&self.nacked).push((message_id.to_string(), reason.to_string()));
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
