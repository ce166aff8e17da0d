//! The mail transport in front of the relay.
//!
//! Accepts plain SMTP, turns every completed transaction into an
//! [`Envelope`](mailhook_common::Envelope) and hands it to an
//! [`EnvelopeHandler`](mailhook_common::traits::EnvelopeHandler).

use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
    time::Duration,
};

use serde::Deserialize;

pub mod command;
pub mod envelope;
pub mod listener;
pub mod session;
pub mod state;
pub mod status;

pub use self::{listener::Listener, session::Session, state::State, status::Status};

const fn default_listen() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 25))
}

const fn default_max_message_size() -> usize {
    10 * 1024 * 1024
}

const fn default_command_timeout() -> u64 {
    300
}

/// Settings for the SMTP side of the relay
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SmtpConfig {
    /// Socket the listener binds to
    ///
    /// Default: `0.0.0.0:25`
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Host name announced in the greeting
    ///
    /// Empty means `$HOSTNAME`, or `localhost` when that is unset.
    #[serde(default)]
    pub banner: String,

    /// Largest accepted message in bytes, `0` for no limit
    ///
    /// Default: 10 MiB
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// How long a client may stay silent between commands, `0` to wait forever
    ///
    /// Default: 5 minutes
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            banner: String::new(),
            max_message_size: default_max_message_size(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl SmtpConfig {
    /// The banner to announce, with the fallbacks applied
    #[must_use]
    pub fn banner(&self) -> Arc<str> {
        if self.banner.is_empty() {
            std::env::var("HOSTNAME")
                .unwrap_or_else(|_| "localhost".to_string())
                .into()
        } else {
            self.banner.as_str().into()
        }
    }

    #[must_use]
    pub const fn command_timeout(&self) -> Option<Duration> {
        match self.command_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
