// Consumer Dispatcher - one subscription loop per league queue

pub mod constants;
mod handler;
mod panic_guard;

use constants::*;
pub use handler::{DeliveryHandler, HandleOutcome, LeagueHandler};
pub use panic_guard::{execute_guarded, PanicGuardResult};

use crate::application::shutdown::{shutdown_channel, ShutdownToken};
use crate::domain::{League, MessageCodec};
use crate::error::{AppError, Result};
use crate::port::{AlertSink, Delivery, DurableQueue, Subscription};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Counters for one subscription
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionStats {
    pub received: u64,
    pub alerts: u64,
    pub discarded: u64,
    pub panicked: u64,
}

/// Stats of every subscription that stopped cleanly
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub subscriptions: Vec<(League, SubscriptionStats)>,
}

impl DispatchReport {
    pub fn stats_for(&self, league: League) -> Option<&SubscriptionStats> {
        self.subscriptions
            .iter()
            .find(|(l, _)| *l == league)
            .map(|(_, stats)| stats)
    }
}

/// Fans in from the league queues and raises alerts
pub struct Dispatcher {
    queue: Arc<dyn DurableQueue>,
    codec: Arc<dyn MessageCodec>,
    alerts: Arc<dyn AlertSink>,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<dyn DurableQueue>,
        codec: Arc<dyn MessageCodec>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            queue,
            codec,
            alerts,
        }
    }

    /// Consume `leagues` until `shutdown` fires or a subscription hits a
    /// connection-level error.
    ///
    /// In-flight messages are always settled before a subscription stops.
    /// The queue connection itself is left open; the caller owns it.
    pub async fn run(&self, leagues: &[League], mut shutdown: ShutdownToken) -> Result<DispatchReport> {
        if leagues.is_empty() {
            return Err(AppError::Config("no queues selected for consumption".into()));
        }

        for league in leagues {
            self.queue
                .declare_queue(league.queue_name(), QUEUE_DURABLE)
                .await?;
        }

        // Internal stop signal: fired on external shutdown or on the first
        // fatal subscription error.
        let (stop, _) = shutdown_channel();
        let mut workers = JoinSet::new();

        for &league in leagues {
            let subscription = match self.queue.subscribe(league.queue_name(), PREFETCH_LIMIT).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    stop.shutdown();
                    while workers.join_next().await.is_some() {}
                    return Err(e);
                }
            };
            let worker = SubscriptionWorker {
                league,
                subscription,
                handler: Arc::new(LeagueHandler::new(
                    league,
                    Arc::clone(&self.codec),
                    Arc::clone(&self.alerts),
                )),
            };
            let token = stop.token();
            workers.spawn(async move { (league, worker.run(token).await) });
        }

        info!(
            queues = ?leagues.iter().map(League::queue_name).collect::<Vec<_>>(),
            "[*] Ready for work. To exit press CTRL+C"
        );

        let mut report = DispatchReport::default();
        let mut failure: Option<AppError> = None;
        let mut stopping = false;

        loop {
            tokio::select! {
                _ = shutdown.wait(), if !stopping => {
                    info!("Shutdown requested, draining subscriptions");
                    stopping = true;
                    stop.shutdown();
                }
                joined = workers.join_next() => match joined {
                    None => break,
                    Some(Ok((league, Ok(stats)))) => report.subscriptions.push((league, stats)),
                    Some(Ok((league, Err(e)))) => {
                        error!(queue = league.queue_name(), error = %e, "Subscription failed");
                        failure.get_or_insert(e);
                        stopping = true;
                        stop.shutdown();
                    }
                    Some(Err(join_err)) => {
                        error!(error = ?join_err, "Subscription task aborted");
                        failure.get_or_insert(AppError::Internal(join_err.to_string()));
                        stopping = true;
                        stop.shutdown();
                    }
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

/// Sequential consumer for one queue
struct SubscriptionWorker {
    league: League,
    subscription: Box<dyn Subscription>,
    handler: Arc<dyn DeliveryHandler>,
}

impl SubscriptionWorker {
    async fn run(mut self, mut stop: ShutdownToken) -> Result<SubscriptionStats> {
        let queue = self.league.queue_name();
        info!(queue, "Subscription started");

        let mut stats = SubscriptionStats::default();
        let result = loop {
            if stop.is_shutdown() {
                break Ok(());
            }

            // Shutdown only interrupts the wait; a delivery already received
            // is always processed and settled below.
            let next = tokio::select! {
                biased;
                _ = stop.wait() => break Ok(()),
                next = self.subscription.next_delivery() => next,
            };

            let delivery = match next {
                Ok(Some(delivery)) => delivery,
                Ok(None) if stop.is_shutdown() => break Ok(()),
                Ok(None) => {
                    error!(queue, "Consumer cancelled by broker");
                    break Err(AppError::Connection(format!(
                        "consumer on '{}' cancelled by broker",
                        queue
                    )));
                }
                Err(e) => break Err(e),
            };

            if let Err(e) = process(&self.handler, delivery, &mut stats).await {
                break Err(e);
            }
        };

        if let Err(e) = self.subscription.cancel().await {
            warn!(queue, error = %e, "Failed to cancel subscription");
        }

        info!(
            queue,
            received = stats.received,
            alerts = stats.alerts,
            discarded = stats.discarded,
            panicked = stats.panicked,
            "Subscription stopped"
        );
        result.map(|()| stats)
    }
}

/// Handle one delivery and ack it, whatever the handler made of it
async fn process(
    handler: &Arc<dyn DeliveryHandler>,
    delivery: Delivery,
    stats: &mut SubscriptionStats,
) -> Result<()> {
    let queue = handler.league().queue_name();
    stats.received += 1;
    if delivery.is_redelivered() {
        debug!(queue, "Processing redelivered message");
    }

    let outcome = execute_guarded(AssertUnwindSafe(|| handler.handle(delivery.payload())));
    match outcome {
        PanicGuardResult::Success(HandleOutcome::Alerted(_)) => stats.alerts += 1,
        PanicGuardResult::Success(HandleOutcome::Quiet) => {}
        PanicGuardResult::Success(HandleOutcome::Discarded(e)) => {
            warn!(queue, error = %e, "Error parsing message, discarding");
            stats.discarded += 1;
        }
        PanicGuardResult::Panicked(msg) => {
            error!(queue, panic_msg = %msg, "Error processing message");
            stats.panicked += 1;
        }
    }

    delivery.ack().await
}
