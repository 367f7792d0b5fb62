//! Worker runner: polls one queue and executes its commands.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::time;

use stationcast_core::config::worker::WorkerConfig;
use stationcast_core::traits::queue::Delivery;

use crate::executor::{CommandHandler, JobExecutionError};
use crate::queue::CommandQueueManager;

/// Default time to wait for in-flight commands on shutdown.
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Polls a single queue and runs its handler with bounded concurrency.
#[derive(Debug)]
pub struct WorkerRunner {
    /// Command transport
    queues: CommandQueueManager,
    /// Queue to poll
    queue_name: String,
    /// Handler for every delivery from `queue_name`
    handler: Arc<dyn CommandHandler>,
    /// Maximum concurrently executing deliveries
    concurrency: usize,
    /// Sleep between polls when idle or saturated
    poll_interval: Duration,
    /// Time allowed for in-flight deliveries on shutdown
    shutdown_grace: Duration,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(
        queues: CommandQueueManager,
        queue_name: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            queues,
            queue_name: queue_name.into(),
            handler,
            concurrency: config.concurrency.max(1),
            poll_interval: Duration::from_millis(config.poll_interval_millis),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Set how long shutdown waits for in-flight deliveries
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Run until the cancel signal is received
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            handler = self.handler.name(),
            queue = %self.queue_name,
            concurrency = self.concurrency,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        loop {
            if *cancel.borrow() {
                break;
            }

            let dispatched = tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        tracing::info!(handler = self.handler.name(), "Worker received shutdown signal");
                        break;
                    }
                    continue;
                }
                dispatched = self.poll_and_execute(&semaphore) => dispatched,
            };

            if !dispatched {
                tokio::select! {
                    changed = cancel.changed() => {
                        if changed.is_err() || *cancel.borrow() {
                            tracing::info!(handler = self.handler.name(), "Worker shutting down");
                            break;
                        }
                    }
                    _ = time::sleep(self.poll_interval) => {}
                }
            }
        }

        tracing::info!(
            handler = self.handler.name(),
            "Worker waiting for in-flight commands to complete..."
        );

        let max_permits = self.concurrency as u32;
        let _ = time::timeout(self.shutdown_grace, semaphore.acquire_many(max_permits)).await;

        tracing::info!(handler = self.handler.name(), "Worker shut down complete");
    }

    /// Receive one delivery and spawn its execution. Returns whether a
    /// delivery was dispatched.
    async fn poll_and_execute(&self, semaphore: &Arc<Semaphore>) -> bool {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                tracing::trace!("All worker slots occupied, waiting...");
                return false;
            }
        };

        let transport = self.queues.transport();
        match transport.receive(&self.queue_name).await {
            Ok(Some(delivery)) => {
                let handler = Arc::clone(&self.handler);
                let max_deliveries = self.queues.max_deliveries();

                tokio::spawn(async move {
                    let _permit = permit;

                    tracing::debug!(
                        handler = handler.name(),
                        queue = %delivery.queue,
                        attempt = delivery.attempt,
                        "Processing command"
                    );

                    let outcome = handler.handle(&delivery).await;
                    if settle(handler.name(), &delivery, outcome, max_deliveries) {
                        if let Err(e) = transport.ack(&delivery).await {
                            tracing::error!(
                                handler = handler.name(),
                                queue = %delivery.queue,
                                error = %e,
                                "Failed to acknowledge command"
                            );
                        }
                    }
                });
                true
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!(queue = %self.queue_name, "No commands available");
                false
            }
            Err(e) => {
                drop(permit);
                tracing::error!(queue = %self.queue_name, error = %e, "Failed to receive command");
                false
            }
        }
    }
}

/// Log the outcome of one delivery and decide whether to acknowledge it.
fn settle(
    handler: &str,
    delivery: &Delivery,
    outcome: Result<(), JobExecutionError>,
    max_deliveries: u32,
) -> bool {
    match outcome {
        Ok(()) => {
            tracing::debug!(handler, attempt = delivery.attempt, "Command completed");
            true
        }
        Err(e) if e.is_terminal() => {
            tracing::warn!(handler, attempt = delivery.attempt, error = %e, "Command dropped");
            true
        }
        Err(e) if delivery.attempt >= max_deliveries => {
            tracing::error!(
                handler,
                attempt = delivery.attempt,
                max_deliveries,
                error = %e,
                "Command abandoned after repeated failures"
            );
            true
        }
        Err(e) => {
            tracing::warn!(
                handler,
                attempt = delivery.attempt,
                max_deliveries,
                error = %e,
                "Command failed, leaving it for redelivery"
            );
            false
        }
    }
}
