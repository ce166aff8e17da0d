pub mod address;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod message;
pub mod traits;

pub use tracing;

pub use self::{
    address::Participant,
    envelope::{Attachment, Envelope, EnvelopeBuilder, Headers},
    message::CanonicalMessage,
};

/// Broadcast to long-running tasks by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}
