//! An envelope handler that keeps everything it is given
#![allow(dead_code)] // Test utility module - not all methods used in every test

use std::time::Duration;

use async_trait::async_trait;
use mailhook_common::{Envelope, error::HandoffError, traits::EnvelopeHandler};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct Recorder {
    envelopes: Mutex<Vec<Envelope>>,
}

impl Recorder {
    pub async fn envelopes(&self) -> Vec<Envelope> {
        self.envelopes.lock().await.clone()
    }

    /// Wait until at least `count` envelopes arrived
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Envelope> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let envelopes = self.envelopes().await;
            if envelopes.len() >= count || tokio::time::Instant::now() >= deadline {
                return envelopes;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl EnvelopeHandler for Recorder {
    async fn handle(&self, envelope: Envelope) -> Result<(), HandoffError> {
        self.envelopes.lock().await.push(envelope);
        Ok(())
    }
}
