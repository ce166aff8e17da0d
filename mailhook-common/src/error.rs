//! Errors crossing the boundary between the SMTP transport and the relay.

use std::{io, net::SocketAddr};

use thiserror::Error;

/// Why an SMTP session ended before the client said QUIT
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Connection closed during {0}")]
    Disconnected(&'static str),

    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),

    #[error("No input for {0} seconds")]
    Timeout(u64),

    #[error("Relay is shutting down")]
    Shutdown,
}

impl SessionError {
    #[must_use]
    pub const fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }

    /// Returns `true` when the client is to blame.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Disconnected(_) | Self::Timeout(_))
    }
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Unable to listen on {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Unable to accept connection: {0}")]
    Accept(#[from] io::Error),
}

/// An envelope could not be handed to the delivery pipeline.
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("Delivery pipeline is closed")]
    Closed,
}
