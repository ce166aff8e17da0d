use async_trait::async_trait;

use crate::{envelope::Envelope, error::HandoffError};

pub trait FiniteStateMachine {
    type Input;
    type Context;

    #[must_use]
    fn transition(self, input: Self::Input, context: &mut Self::Context) -> Self;
}

/// A processing step the transport invokes once per accepted envelope.
///
/// Implementations must return promptly: returning `Ok` means the envelope
/// has been taken over, not that it has reached its destination.
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    /// # Errors
    /// When the envelope could not be taken over, e.g. during shutdown.
    async fn handle(&self, envelope: Envelope) -> Result<(), HandoffError>;
}
