// Durable Queue Port (Interface)
//
// Named, durable, at-least-once queues with manual acknowledgment and
// per-consumer prefetch. The broker owns the queues; adapters own the
// connection and release it in `close`.

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Broker operations used by the producer and the dispatcher
#[async_trait]
pub trait DurableQueue: Send + Sync {
    /// Declare a queue. Idempotent for matching durability,
    /// `AppError::Conflict` when the queue exists with different durability.
    async fn declare_queue(&self, name: &str, durable: bool) -> Result<()>;

    /// Publish a persistent message. Returns once the broker has accepted it.
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()>;

    /// Start consuming with manual acks and at most `prefetch` unacknowledged
    /// deliveries outstanding.
    async fn subscribe(&self, queue: &str, prefetch: u16) -> Result<Box<dyn Subscription>>;

    /// Tear down channels and the connection
    async fn close(&self) -> Result<()>;
}

/// A live consumer on one queue
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next delivery. `Ok(None)` once the consumer is cancelled.
    async fn next_delivery(&mut self) -> Result<Option<Delivery>>;

    /// Stop receiving new deliveries
    async fn cancel(&mut self) -> Result<()>;
}

/// Settles exactly one delivery
#[async_trait]
pub trait DeliveryAcker: Send {
    async fn ack(self: Box<Self>) -> Result<()>;

    async fn reject(self: Box<Self>, requeue: bool) -> Result<()>;
}

/// A message handed to a consumer. Settling it consumes the value, so the
/// delivery handle cannot be used after ack/reject.
pub struct Delivery {
    payload: Vec<u8>,
    redelivered: bool,
    acker: Box<dyn DeliveryAcker>,
}

impl Delivery {
    pub fn new(payload: Vec<u8>, redelivered: bool, acker: Box<dyn DeliveryAcker>) -> Self {
        Self {
            payload,
            redelivered,
            acker,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Broker flagged this as a redelivery (an earlier consumer never acked it)
    pub fn is_redelivered(&self) -> bool {
        self.redelivered
    }

    pub async fn ack(self) -> Result<()> {
        self.acker.ack().await
    }

    pub async fn reject(self, requeue: bool) -> Result<()> {
        self.acker.reject(requeue).await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("payload", &String::from_utf8_lossy(&self.payload))
            .field("redelivered", &self.redelivered)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct QueueState {
        durable: bool,
        /// (payload, redelivered)
        ready: VecDeque<(Vec<u8>, bool)>,
        published: Vec<Vec<u8>>,
        acked: Vec<Vec<u8>>,
        rejected: Vec<Vec<u8>>,
        in_flight: usize,
        max_in_flight: usize,
        prefetch: Option<u16>,
        /// Broker-side consumer cancel, e.g. after the queue was deleted
        consumers_cancelled: bool,
    }

    #[derive(Default)]
    struct Broker {
        queues: HashMap<String, QueueState>,
        disconnected: bool,
        closed: bool,
        publish_failures: usize,
    }

    impl Broker {
        fn check_connected(&self) -> Result<()> {
            if self.disconnected || self.closed {
                return Err(AppError::Connection("in-memory broker is not connected".into()));
            }
            Ok(())
        }

        fn queue_mut(&mut self, name: &str) -> Result<&mut QueueState> {
            self.queues
                .get_mut(name)
                .ok_or_else(|| AppError::NotFound(format!("queue '{}'", name)))
        }
    }

    #[derive(Default)]
    struct Shared {
        broker: Mutex<Broker>,
        changed: Notify,
    }

    impl Shared {
        fn lock(&self) -> MutexGuard<'_, Broker> {
            self.broker.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// In-process broker with the same contract as the AMQP adapter.
    ///
    /// Prefetch and in-flight accounting is per queue, which matches the
    /// single consumer per queue that the dispatcher opens.
    #[derive(Clone, Default)]
    pub struct InMemoryQueue {
        shared: Arc<Shared>,
    }

    impl InMemoryQueue {
        pub fn new() -> Self {
            Self::default()
        }

        /// Simulate the broker dropping the connection
        pub fn disconnect(&self) {
            self.shared.lock().disconnected = true;
            self.shared.changed.notify_waiters();
        }

        /// Simulate the broker cancelling every consumer of `queue`
        pub fn cancel_consumers(&self, queue: &str) {
            if let Some(state) = self.shared.lock().queues.get_mut(queue) {
                state.consumers_cancelled = true;
            }
            self.shared.changed.notify_waiters();
        }

        /// Make the next `count` publishes fail with a channel-level error
        pub fn fail_next_publishes(&self, count: usize) {
            self.shared.lock().publish_failures = count;
        }

        pub fn is_closed(&self) -> bool {
            self.shared.lock().closed
        }

        pub fn published(&self, queue: &str) -> Vec<String> {
            self.read(queue, |q| lossy(&q.published))
        }

        pub fn acked(&self, queue: &str) -> Vec<String> {
            self.read(queue, |q| lossy(&q.acked))
        }

        pub fn rejected(&self, queue: &str) -> Vec<String> {
            self.read(queue, |q| lossy(&q.rejected))
        }

        /// Messages waiting for delivery
        pub fn pending(&self, queue: &str) -> usize {
            self.read(queue, |q| q.ready.len())
        }

        /// Highest number of unacknowledged deliveries ever outstanding
        pub fn max_in_flight(&self, queue: &str) -> usize {
            self.read(queue, |q| q.max_in_flight)
        }

        /// Prefetch requested by the most recent subscriber
        pub fn prefetch(&self, queue: &str) -> Option<u16> {
            self.read(queue, |q| q.prefetch)
        }

        fn read<T: Default>(&self, queue: &str, f: impl FnOnce(&QueueState) -> T) -> T {
            self.shared.lock().queues.get(queue).map(f).unwrap_or_default()
        }
    }

    fn lossy(payloads: &[Vec<u8>]) -> Vec<String> {
        payloads
            .iter()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect()
    }

    #[async_trait]
    impl DurableQueue for InMemoryQueue {
        async fn declare_queue(&self, name: &str, durable: bool) -> Result<()> {
            let mut broker = self.shared.lock();
            broker.check_connected()?;
            match broker.queues.get(name) {
                Some(existing) if existing.durable != durable => Err(AppError::Conflict(format!(
                    "queue '{}' already declared with durable={}",
                    name, existing.durable
                ))),
                Some(_) => Ok(()),
                None => {
                    broker.queues.insert(
                        name.to_string(),
                        QueueState {
                            durable,
                            ..Default::default()
                        },
                    );
                    Ok(())
                }
            }
        }

        async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
            {
                let mut broker = self.shared.lock();
                broker.check_connected()?;
                if broker.publish_failures > 0 {
                    broker.publish_failures -= 1;
                    return Err(AppError::Broker("publish rejected by broker".into()));
                }
                let state = broker.queue_mut(queue)?;
                state.published.push(payload.to_vec());
                state.ready.push_back((payload.to_vec(), false));
            }
            self.shared.changed.notify_waiters();
            Ok(())
        }

        async fn subscribe(&self, queue: &str, prefetch: u16) -> Result<Box<dyn Subscription>> {
            let mut broker = self.shared.lock();
            broker.check_connected()?;
            broker.queue_mut(queue)?.prefetch = Some(prefetch);
            Ok(Box::new(InMemorySubscription {
                shared: Arc::clone(&self.shared),
                queue: queue.to_string(),
                prefetch: usize::from(prefetch.max(1)),
                cancelled: false,
            }))
        }

        async fn close(&self) -> Result<()> {
            self.shared.lock().closed = true;
            self.shared.changed.notify_waiters();
            Ok(())
        }
    }

    struct InMemorySubscription {
        shared: Arc<Shared>,
        queue: String,
        prefetch: usize,
        cancelled: bool,
    }

    #[async_trait]
    impl Subscription for InMemorySubscription {
        async fn next_delivery(&mut self) -> Result<Option<Delivery>> {
            loop {
                // Register interest before inspecting state so a concurrent
                // publish/ack between the check and the await is not missed.
                let changed = self.shared.changed.notified();
                tokio::pin!(changed);
                changed.as_mut().enable();

                {
                    let mut broker = self.shared.lock();
                    broker.check_connected()?;
                    if self.cancelled {
                        return Ok(None);
                    }
                    let state = broker.queue_mut(&self.queue)?;
                    if state.consumers_cancelled {
                        return Ok(None);
                    }
                    if state.in_flight < self.prefetch {
                        if let Some((payload, redelivered)) = state.ready.pop_front() {
                            state.in_flight += 1;
                            state.max_in_flight = state.max_in_flight.max(state.in_flight);
                            let acker = InMemoryAcker {
                                shared: Arc::clone(&self.shared),
                                queue: self.queue.clone(),
                                payload: payload.clone(),
                            };
                            return Ok(Some(Delivery::new(payload, redelivered, Box::new(acker))));
                        }
                    }
                }

                changed.await;
            }
        }

        async fn cancel(&mut self) -> Result<()> {
            self.cancelled = true;
            Ok(())
        }
    }

    struct InMemoryAcker {
        shared: Arc<Shared>,
        queue: String,
        payload: Vec<u8>,
    }

    impl InMemoryAcker {
        fn settle(self, outcome: impl FnOnce(&mut QueueState, Vec<u8>)) -> Result<()> {
            {
                let mut broker = self.shared.lock();
                broker.check_connected()?;
                let state = broker.queue_mut(&self.queue)?;
                state.in_flight = state.in_flight.saturating_sub(1);
                outcome(state, self.payload);
            }
            self.shared.changed.notify_waiters();
            Ok(())
        }
    }

    #[async_trait]
    impl DeliveryAcker for InMemoryAcker {
        async fn ack(self: Box<Self>) -> Result<()> {
            self.settle(|state, payload| state.acked.push(payload))
        }

        async fn reject(self: Box<Self>, requeue: bool) -> Result<()> {
            self.settle(|state, payload| {
                if requeue {
                    state.ready.push_front((payload, true));
                } else {
                    state.rejected.push(payload);
                }
            })
        }
    }

}
