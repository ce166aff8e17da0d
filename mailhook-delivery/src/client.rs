use std::sync::Arc;

use mailhook_common::{CanonicalMessage, incoming, internal, outgoing};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::{error, warn};

use crate::{
    config::DeliveryConfig,
    error::DeliveryError,
    fallback::{FallbackArtifacts, FallbackWriter},
};

pub const USER_AGENT: &str = concat!("mailhook/", env!("CARGO_PKG_VERSION"));

/// A response the webhook actually sent back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    pub status: u16,
    pub body: String,
}

/// Outcome of a single delivery attempt
#[derive(Debug)]
pub enum Attempt {
    Completed(Completed),
    Failed {
        error: DeliveryError,
        artifacts: FallbackArtifacts,
    },
}

/// Posts canonical messages to the configured webhook.
///
/// One attempt per message, no retries. Failures that happen before a
/// response exists are handed to the [`FallbackWriter`].
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    http: reqwest::Client,
    api_url: Arc<str>,
    fallback: FallbackWriter,
}

impl DeliveryClient {
    /// # Errors
    /// If the underlying HTTP client cannot be initialised.
    pub fn new(config: &DeliveryConfig) -> Result<Self, DeliveryError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build().map_err(DeliveryError::Client)?,
            api_url: Arc::from(config.api_url.as_str()),
            fallback: FallbackWriter::new(&config.fallback_dir),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub const fn fallback(&self) -> &FallbackWriter {
        &self.fallback
    }

    /// Run one delivery attempt for `message`.
    ///
    /// Never returns an error: build and transport failures are persisted
    /// and reported as [`Attempt::Failed`].
    pub async fn attempt(&self, message: &CanonicalMessage) -> Attempt {
        let payload = match serde_json::to_vec(message) {
            Ok(payload) => payload,
            Err(err) => {
                error!("Failed to serialise message {:?}: {err}", message.id);
                return Attempt::Failed {
                    error: err.into(),
                    artifacts: FallbackArtifacts::default(),
                };
            }
        };

        match self.send(payload.clone()).await {
            Ok(completed) => Attempt::Completed(completed),
            Err(error) => {
                match &error {
                    DeliveryError::Build { .. } => {
                        error!("Failed to build request, saving to local file: {error}");
                    }
                    _ => error!("Failed to connect to the given URL {}: {error}", self.api_url),
                }

                let artifacts = if error.is_persisted() {
                    self.fallback.persist(&error.to_string(), &payload).await
                } else {
                    FallbackArtifacts::default()
                };

                Attempt::Failed { error, artifacts }
            }
        }
    }

    async fn send(&self, payload: Vec<u8>) -> Result<Completed, DeliveryError> {
        let length = payload.len();
        let request = self
            .http
            .post(&*self.api_url)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, length)
            .body(payload)
            .build()
            .map_err(|source| DeliveryError::Build {
                url: self.api_url.to_string(),
                source,
            })?;

        outgoing!(level = DEBUG, "POST {} ({length} bytes)", self.api_url);

        let response =
            self.http
                .execute(request)
                .await
                .map_err(|source| DeliveryError::Transport {
                    url: self.api_url.to_string(),
                    source,
                })?;

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!("Failed to read response body: {err}");
                String::new()
            }
        };

        incoming!(level = INFO, "Response status: {status}");
        incoming!(level = INFO, "Response body: {body}");
        internal!("Delivery to {} completed", self.api_url);

        Ok(Completed {
            status: status.as_u16(),
            body,
        })
    }
}
