//! Getting canonical messages to the webhook.
//!
//! [`DeliveryProcessor`] is the handler the SMTP transport hands envelopes
//! to. Each message is posted exactly once by [`DeliveryClient`]; requests
//! that never produce a response are written to disk by [`FallbackWriter`],
//! and responses are classified by [`Verdict`].

pub mod client;
pub mod config;
pub mod error;
pub mod fallback;
pub mod processor;
pub mod triage;

pub use self::{
    client::{Attempt, Completed, DeliveryClient, USER_AGENT},
    config::DeliveryConfig,
    error::{DeliveryError, FallbackError},
    fallback::{FallbackArtifacts, FallbackWriter},
    processor::{DeliveryMonitor, DeliveryProcessor, Drained},
    triage::Verdict,
};
