//! Bounded delivery pool.
//!
//! The transport hands envelopes to [`DeliveryProcessor`], which turns each
//! one into a [`CanonicalMessage`] and queues it. A fixed number of workers
//! drain the queue, one delivery attempt per message. Submitting only waits
//! for queue space, never for the webhook.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mailhook_common::{
    CanonicalMessage, Envelope, error::HandoffError, internal, traits::EnvelopeHandler,
};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinSet,
};
use tracing::{error, info, warn};

use crate::{
    client::{Attempt, DeliveryClient},
    config::DeliveryConfig,
    error::DeliveryError,
    triage::Verdict,
};

type Queue = Arc<Mutex<mpsc::Receiver<CanonicalMessage>>>;

/// Entry point for messages into the delivery pool
#[derive(Debug, Clone)]
pub struct DeliveryProcessor {
    queue: mpsc::Sender<CanonicalMessage>,
}

/// The controller side of the pool: fatal verdicts and worker lifetimes
#[derive(Debug)]
pub struct DeliveryMonitor {
    fatal: mpsc::Receiver<Verdict>,
    workers: JoinSet<()>,
}

/// How the pool ended, see [`DeliveryMonitor::drain`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drained {
    /// Every worker stopped before the timeout
    pub finished: bool,
    /// A fatal verdict no one has collected yet, possibly raised while draining
    pub fatal: Option<Verdict>,
}

impl DeliveryProcessor {
    /// Start the delivery workers described by `config`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// If the HTTP client or the fallback directory cannot be set up.
    pub fn spawn(config: &DeliveryConfig) -> Result<(Self, DeliveryMonitor), DeliveryError> {
        let client = DeliveryClient::new(config)?;
        client.fallback().init()?;

        internal!(
            level = INFO,
            "Delivering to {} with {} workers (queue capacity {})",
            client.api_url(),
            config.workers,
            config.queue_capacity
        );

        Ok(Self::with_client(
            client,
            config.workers,
            config.queue_capacity,
        ))
    }

    /// Start `workers` tasks sharing `client`.
    pub fn with_client(
        client: DeliveryClient,
        workers: usize,
        capacity: usize,
    ) -> (Self, DeliveryMonitor) {
        let (queue, receiver) = mpsc::channel(capacity.max(1));
        let (fatal_tx, fatal) = mpsc::channel(1);

        let receiver: Queue = Arc::new(Mutex::new(receiver));
        let client = Arc::new(client);

        let mut set = JoinSet::new();
        for worker in 0..workers.max(1) {
            set.spawn(work(
                worker,
                Arc::clone(&client),
                Arc::clone(&receiver),
                fatal_tx.clone(),
            ));
        }

        (
            Self { queue },
            DeliveryMonitor {
                fatal,
                workers: set,
            },
        )
    }

    /// Queue a message, waiting only if the queue is full.
    ///
    /// # Errors
    /// If the workers are gone.
    pub async fn submit(&self, message: CanonicalMessage) -> Result<(), HandoffError> {
        self.queue
            .send(message)
            .await
            .map_err(|_| HandoffError::Closed)
    }
}

#[async_trait]
impl EnvelopeHandler for DeliveryProcessor {
    async fn handle(&self, envelope: Envelope) -> Result<(), HandoffError> {
        self.submit(CanonicalMessage::from_envelope(&envelope)).await
    }
}

impl DeliveryMonitor {
    /// Wait for the first fatal verdict.
    ///
    /// Returns `None` once every worker has stopped without one.
    pub async fn fatal(&mut self) -> Option<Verdict> {
        self.fatal.recv().await
    }

    /// Wait for the workers to finish what is already queued.
    ///
    /// Workers still running once `timeout` elapsed are aborted. A fatal
    /// verdict raised by the last deliveries is returned, not lost.
    pub async fn drain(mut self, timeout: Duration) -> Drained {
        let finished = tokio::time::timeout(timeout, async {
            while let Some(result) = self.workers.join_next().await {
                if let Err(err) = result {
                    error!("Delivery worker failed: {err}");
                }
            }
        })
        .await
        .is_ok();

        if !finished {
            warn!(
                remaining = self.workers.len(),
                "Shutdown timeout exceeded, abandoning in-flight deliveries"
            );
            self.workers.abort_all();
        }

        Drained {
            finished,
            fatal: self.fatal.try_recv().ok(),
        }
    }
}

async fn work(
    worker: usize,
    client: Arc<DeliveryClient>,
    queue: Queue,
    fatal: mpsc::Sender<Verdict>,
) {
    internal!("Delivery worker {worker} started");

    loop {
        let next = queue.lock().await.recv().await;
        let Some(message) = next else {
            break;
        };

        let verdict = deliver(&client, &message).await;
        if let Some(verdict) = verdict.filter(|verdict| verdict.is_fatal()) {
            // Only the first fatal verdict matters, the relay is stopping.
            let _ = fatal.try_send(verdict);
        }
    }

    internal!("Delivery worker {worker} stopped");
}

/// Deliver one message and triage the response, if there was one.
pub async fn deliver(client: &DeliveryClient, message: &CanonicalMessage) -> Option<Verdict> {
    match client.attempt(message).await {
        Attempt::Completed(completed) => {
            let verdict = Verdict::assess(completed.status);

            match verdict {
                Verdict::Delivered(status) if (200..400).contains(&status) => {
                    info!("{verdict}");
                }
                Verdict::Delivered(_) => {
                    warn!("{verdict} (treated as delivered)");
                }
                Verdict::Declined(_) | Verdict::ServerError(_) => {
                    error!("{verdict}");
                }
            }

            Some(verdict)
        }
        Attempt::Failed { error, artifacts } => {
            if !artifacts.is_complete() && error.is_persisted() {
                error!("Message {:?} could not be fully saved", message.id);
            }
            None
        }
    }
}
