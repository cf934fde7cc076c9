//! Background pull loop.
//!
//! One thread per pull subscription: poll, run the receiver, ack or nack.
//! Stopping is cooperative. The stop signal is checked between messages, so
//! a message that is already being dispatched always finishes (and is
//! acked or nacked) before the thread exits.

use std::sync::mpsc::{channel, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::bus::Subscriber;
use crate::config::PullOptions;
use crate::error::ConfigError;

use super::{Receipt, Receiver};

/// Counters accumulated by a pull loop.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PullStats {
    /// Poll cycles completed.
    pub polls: usize,
    /// Messages dispatched to a handler set (or to none, for a registered
    /// type without handlers).
    pub handled: usize,
    pub unregistered: usize,
    pub undecodable: usize,
    /// Messages that were not envelopes; these are nacked.
    pub malformed: usize,
    /// Individual handler failures across all messages.
    pub handler_failures: usize,
    /// Failed polls, acks and nacks.
    pub transport_errors: usize,
    /// Messages whose processing outlasted the ack deadline.
    pub deadline_exceeded: usize,
}

impl PullStats {
    fn record(&mut self, receipt: &Receipt) {
        match receipt {
            Receipt::Handled { failed, .. } => {
                self.handled += 1;
                self.handler_failures += failed;
            }
            Receipt::Unregistered { .. } => self.unregistered += 1,
            Receipt::Undecodable(_) => self.undecodable += 1,
            Receipt::Malformed(_) => self.malformed += 1,
        }
    }
}

/// Handle to a running pull loop. Drop or call `stop()` to shut down.
pub struct PullHandle {
    subscription_id: String,
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<PullStats>>,
}

impl PullHandle {
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Stop the loop and wait for the in-flight message to finish. Returns stats.
    pub fn stop(mut self) -> PullStats {
        let _ = self.stop_tx.send(());
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => PullStats::default(),
        }
    }

    /// Signal stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl Drop for PullHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}

/// Start pulling from `subscriber` and dispatching through `receiver`.
///
/// Fails when `options` does not validate or has `enable_pull_subscriber`
/// unset.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use event_relay::bus::InMemoryBroker;
/// use event_relay::receiver::pull;
/// use event_relay::{PullOptions, Receiver, TypeRegistry};
///
/// let broker = InMemoryBroker::new();
/// let receiver = Arc::new(Receiver::new(Arc::new(TypeRegistry::new())));
/// let options = PullOptions {
///     subscription_id: "orders-sub".into(),
///     enable_pull_subscriber: true,
///     poll_interval_ms: 5,
///     ..PullOptions::default()
/// };
///
/// let handle = pull::spawn(receiver, broker.new_subscriber(), &options).unwrap();
/// let stats = handle.stop();
/// assert_eq!(stats.handled, 0);
/// ```
pub fn spawn<S>(
    receiver: Arc<Receiver>,
    subscriber: S,
    options: &PullOptions,
) -> Result<PullHandle, ConfigError>
where
    S: Subscriber + 'static,
{
    options.validate()?;
    if !options.enable_pull_subscriber {
        return Err(ConfigError::InvalidValue {
            key: "enablePullSubscriber".into(),
            reason: format!(
                "pull subscriber for {} is not enabled",
                options.subscription_id
            ),
        });
    }

    let subscription_id = options.subscription_id.clone();
    let poll_interval = options.poll_interval();
    let ack_deadline = options.ack_deadline();
    let (stop_tx, stop_rx) = channel();

    let thread_subscription = subscription_id.clone();
    let handle = thread::spawn(move || {
        let subscription = thread_subscription;
        let mut stats = PullStats::default();
        info!(subscription = %subscription, "pull loop started");

        loop {
            match stop_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            stats.polls += 1;

            let message = match subscriber.poll(poll_interval.as_millis() as u64) {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(e) => {
                    stats.transport_errors += 1;
                    warn!(subscription = %subscription, error = %e, "poll failed");
                    thread::sleep(poll_interval);
                    continue;
                }
            };

            let started = Instant::now();
            let receipt = receiver.receive(&message.body, message.content_type());
            let elapsed = started.elapsed();
            if elapsed > ack_deadline {
                stats.deadline_exceeded += 1;
                warn!(
                    subscription = %subscription,
                    message_id = %message.id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "processing exceeded the ack deadline; the broker may redeliver"
                );
            }
            stats.record(&receipt);

            let settled = if receipt.is_ack() {
                subscriber.ack(&message.id)
            } else {
                subscriber.nack(&message.id, &receipt.to_string())
            };
            match settled {
                Ok(()) => debug!(
                    subscription = %subscription,
                    message_id = %message.id,
                    ack = receipt.is_ack(),
                    %receipt,
                    "message settled"
                ),
                Err(e) => {
                    stats.transport_errors += 1;
                    error!(
                        subscription = %subscription,
                        message_id = %message.id,
                        error = %e,
                        "failed to settle message"
                    );
                }
            }
        }

        info!(subscription = %subscription, polls = stats.polls, "pull loop stopped");
        stats
    });

    Ok(PullHandle {
        subscription_id,
        stop_tx,
        handle: Some(handle),
    })
}
