use core::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// One mail participant as seen on the SMTP envelope.
///
/// Neither part is validated; an empty reverse-path (`MAIL FROM:<>`) is
/// represented by two empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub user: String,
    pub host: String,
}

impl Participant {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
        }
    }

    /// Split an address at its last `@`.
    ///
    /// An address without an `@` is treated as a bare local part.
    ///
    /// ```
    /// use mailhook_common::Participant;
    ///
    /// assert_eq!(
    ///     Participant::split("\"odd@user\"@example.com"),
    ///     Participant::new("\"odd@user\"", "example.com")
    /// );
    /// assert_eq!(Participant::split("postmaster"), Participant::new("postmaster", ""));
    /// ```
    pub fn split(address: &str) -> Self {
        address
            .rsplit_once('@')
            .map_or_else(|| Self::new(address, ""), |(user, host)| Self::new(user, host))
    }

    /// The canonical `user@host` form of this participant.
    #[inline]
    pub fn normalize(&self) -> String {
        self.to_string()
    }
}

impl Display for Participant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.host)
    }
}

/// Normalize every participant, keeping order and duplicates.
pub fn normalize_all(participants: &[Participant]) -> Vec<String> {
    participants.iter().map(Participant::normalize).collect()
}
