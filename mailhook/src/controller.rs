//! Wires the SMTP listener to the delivery pool and decides how the process ends.

use std::{future::Future, io, net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use anyhow::Context;
use mailhook_common::{Signal, error::ListenerError, internal, traits::EnvelopeHandler};
use mailhook_delivery::{DeliveryError, DeliveryMonitor, DeliveryProcessor, Verdict};
use mailhook_smtp::Listener;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, warn};

use crate::config::RelayConfig;

/// How long queued deliveries may take to finish once shutdown starts
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Why the process ended, see [`ExitStatus::code`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Stopped by a signal
    Normal,
    /// The API declined a message (401, 403, 404)
    Declined,
    /// The API reported an internal error (500)
    ServerError,
    /// The SMTP side could not start, or failed while running
    Transport,
    /// The configuration could not be loaded or used
    Config,
}

impl ExitStatus {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Declined => 1,
            Self::ServerError => 2,
            Self::Transport => 3,
            Self::Config => 4,
        }
    }
}

impl From<Verdict> for ExitStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Delivered(_) => Self::Normal,
            Verdict::Declined(_) => Self::Declined,
            Verdict::ServerError(_) => Self::ServerError,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        Self::from(status.code())
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

impl StartupError {
    #[must_use]
    pub const fn exit_status(&self) -> ExitStatus {
        match self {
            Self::Delivery(_) => ExitStatus::Config,
            Self::Listener(_) => ExitStatus::Transport,
        }
    }
}

/// A started relay: socket bound, delivery workers running
pub struct Relay {
    listener: Listener,
    processor: DeliveryProcessor,
    monitor: DeliveryMonitor,
    shutdown: broadcast::Sender<Signal>,
}

impl Relay {
    /// # Errors
    /// If the delivery pool cannot be set up or the SMTP socket cannot be bound.
    pub async fn start(config: &RelayConfig) -> Result<Self, StartupError> {
        if let Some(err) = config.delivery.api_url_error() {
            warn!(
                "api_url {} is not a valid URL ({err}), messages will be saved locally",
                config.delivery.api_url
            );
        }

        let (processor, monitor) = DeliveryProcessor::spawn(&config.delivery)?;
        let listener = Listener::bind(&config.smtp).await?;
        let (shutdown, _) = broadcast::channel(16);

        Ok(Self {
            listener,
            processor,
            monitor,
            shutdown,
        })
    }

    /// # Errors
    /// If the socket has gone away.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Relay mail until `stop` completes, the listener fails, or a delivery
    /// gets a fatal response.
    pub async fn run(self, stop: impl Future<Output = ()> + Send) -> ExitStatus {
        let Self {
            listener,
            processor,
            mut monitor,
            shutdown,
        } = self;

        internal!(level = INFO, "Relay running");

        let handler: Arc<dyn EnvelopeHandler> = Arc::new(processor);
        let mut server = tokio::spawn(listener.serve(handler, shutdown.subscribe()));

        let status = tokio::select! {
            Some(verdict) = monitor.fatal() => {
                error!(status = verdict.status(), "Stopping relay: {verdict}");
                // In-flight deliveries are not waited for.
                return ExitStatus::from(verdict);
            }

            result = &mut server => {
                match result {
                    Ok(Ok(())) => ExitStatus::Normal,
                    Ok(Err(err)) => {
                        error!("SMTP listener failed: {err}");
                        ExitStatus::Transport
                    }
                    Err(err) => {
                        error!("SMTP listener task failed: {err}");
                        ExitStatus::Transport
                    }
                }
            }

            () = stop => {
                internal!(level = INFO, "Shutting down...");
                ExitStatus::Normal
            }
        };

        let _ = shutdown.send(Signal::Shutdown);
        if !server.is_finished() {
            let result = server.await;
            if let Err(err) = result {
                error!("SMTP listener task failed: {err}");
            }
        }

        let drained = monitor.drain(DRAIN_TIMEOUT).await;
        if drained.finished {
            internal!(level = INFO, "All queued deliveries finished");
        }

        match drained.fatal {
            Some(verdict) if status == ExitStatus::Normal => {
                error!(
                    status = verdict.status(),
                    "Fatal response while draining: {verdict}"
                );
                ExitStatus::from(verdict)
            }
            _ => status,
        }
    }
}

/// Wait for CTRL+C or SIGTERM.
///
/// # Errors
/// If the signal handlers cannot be installed.
pub async fn shutdown_signal() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Unable to listen for SIGTERM")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Unable to listen for CTRL+C")?;
            internal!(level = INFO, "CTRL+C entered, shutting down");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate signal received, shutting down");
        }
    };

    Ok(())
}

/// Start the relay described by `config` and run it until the process should exit.
pub async fn run(config: RelayConfig) -> ExitStatus {
    let relay = match Relay::start(&config).await {
        Ok(relay) => relay,
        Err(err) => {
            error!("Unable to start relay: {err}");
            return err.exit_status();
        }
    };

    relay
        .run(async {
            if let Err(err) = shutdown_signal().await {
                error!("{err:#}");
                std::future::pending::<()>().await;
            }
        })
        .await
}
