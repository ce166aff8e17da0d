use std::{io, net::SocketAddr, sync::Arc};

use futures_util::future::join_all;
use mailhook_common::{Signal, error::ListenerError, internal, traits::EnvelopeHandler};
use tokio::{net::TcpListener, sync::broadcast, task::JoinHandle};

use crate::{
    SmtpConfig,
    session::{Session, SessionConfig},
};

/// A bound SMTP socket, ready to serve sessions
#[derive(Debug)]
pub struct Listener {
    listener: TcpListener,
    config: SessionConfig,
}

impl Listener {
    /// # Errors
    /// If the configured address cannot be bound.
    pub async fn bind(config: &SmtpConfig) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(config.listen)
            .await
            .map_err(|source| ListenerError::Bind {
                address: config.listen,
                source,
            })?;

        internal!(level = INFO, "SMTP listener bound to {}", config.listen);

        Ok(Self {
            listener,
            config: SessionConfig::from(config),
        })
    }

    /// # Errors
    /// If the socket has gone away.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until shutdown, then wait for open sessions.
    ///
    /// # Errors
    /// If accepting a connection fails.
    pub async fn serve(
        self,
        handler: Arc<dyn EnvelopeHandler>,
        mut shutdown: broadcast::Receiver<Signal>,
    ) -> Result<(), ListenerError> {
        let mut sessions: Vec<JoinHandle<()>> = Vec::default();

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    internal!(
                        level = INFO,
                        "SMTP listener received shutdown signal, finishing {} sessions ...",
                        sessions.len()
                    );
                    join_all(sessions).await;
                    break;
                }

                connection = self.listener.accept() => {
                    let (stream, peer) = connection?;
                    tracing::debug!("Connection received from {peer}");

                    sessions.retain(|session| !session.is_finished());

                    let session = Session::create(
                        stream,
                        peer,
                        self.config.clone(),
                        Arc::clone(&handler),
                    );
                    let signal = shutdown.resubscribe();

                    sessions.push(tokio::spawn(async move {
                        match session.run(signal).await {
                            Ok(()) => {}
                            Err(err) if err.is_shutdown() => {
                                internal!(level = DEBUG, "Session with {peer} ended by shutdown");
                            }
                            Err(err) if err.is_client_error() => {
                                internal!(level = WARN, "Session with {peer} failed: {err}");
                            }
                            Err(err) => internal!(level = ERROR, "Session with {peer} failed: {err}"),
                        }
                    }));
                }
            }
        }

        internal!(level = INFO, "SMTP listener stopped");
        Ok(())
    }
}
