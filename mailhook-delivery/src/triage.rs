//! Maps the HTTP status of a completed delivery onto what the relay does next.
//!
//! | Status          | Verdict                  | Exit code |
//! |-----------------|--------------------------|-----------|
//! | 401, 403, 404   | [`Verdict::Declined`]    | 1         |
//! | 500             | [`Verdict::ServerError`] | 2         |
//! | anything else   | [`Verdict::Delivered`]   | -         |
//!
//! The two fatal verdicts stop the whole relay, not just the one delivery.

use core::fmt::{self, Display, Formatter};

/// Exit code used when the API declined the message
pub const EXIT_DECLINED: u8 = 1;

/// Exit code used when the API reported an internal error
pub const EXIT_SERVER_ERROR: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep running. The status is kept for logging.
    Delivered(u16),
    /// Client side misconfiguration: credentials or endpoint.
    Declined(u16),
    /// The API is broken.
    ServerError(u16),
}

impl Verdict {
    #[must_use]
    pub const fn assess(status: u16) -> Self {
        match status {
            401 | 403 | 404 => Self::Declined(status),
            500 => Self::ServerError(status),
            _ => Self::Delivered(status),
        }
    }

    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::Delivered(status) | Self::Declined(status) | Self::ServerError(status) => status,
        }
    }

    /// Returns `true` if the relay has to stop.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Delivered(_))
    }

    /// Process exit code for fatal verdicts
    #[must_use]
    pub const fn exit_code(self) -> Option<u8> {
        match self {
            Self::Delivered(_) => None,
            Self::Declined(_) => Some(EXIT_DECLINED),
            Self::ServerError(_) => Some(EXIT_SERVER_ERROR),
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered(status) => write!(f, "Good response, {status}"),
            Self::Declined(status) => write!(
                f,
                "The API has declined to accept the submitted email. {status}"
            ),
            Self::ServerError(status) => {
                write!(f, "Issue with the connecting server. {status}")
            }
        }
    }
}
