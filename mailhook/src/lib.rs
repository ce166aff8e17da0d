//! Relays mail received over SMTP to an HTTP webhook.

pub mod config;
pub mod controller;

pub use self::{
    config::{ConfigError, RelayConfig},
    controller::{ExitStatus, Relay},
};
