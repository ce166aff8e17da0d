use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

pub const DEFAULT_API_URL: &str = "http://localhost:80/report_email";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

const fn default_workers() -> usize {
    3
}

const fn default_queue_capacity() -> usize {
    64
}

const fn default_request_timeout() -> u64 {
    30
}

fn default_fallback_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Settings for delivering canonical messages to the webhook
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// Destination the messages are POSTed to
    ///
    /// Not validated here: a URL that cannot be turned into a request is
    /// handled per message by the fallback writer.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Number of concurrent delivery workers
    ///
    /// Default: 3
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// How many messages may wait for a worker before the transport is held back
    ///
    /// Default: 64
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Upper bound for a single HTTP attempt, in seconds
    ///
    /// `0` disables the timeout.
    ///
    /// Default: 30 seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Directory receiving the fallback artifacts of failed deliveries
    #[serde(default = "default_fallback_dir")]
    pub fallback_dir: PathBuf,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            request_timeout_secs: default_request_timeout(),
            fallback_dir: default_fallback_dir(),
        }
    }
}

impl DeliveryConfig {
    /// Why `api_url` cannot be parsed, if it cannot.
    #[must_use]
    pub fn api_url_error(&self) -> Option<String> {
        reqwest::Url::parse(&self.api_url)
            .err()
            .map(|err| err.to_string())
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
