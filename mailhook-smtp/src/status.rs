use core::fmt::{self, Display, Formatter};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Debug)]
pub enum Status {
    ServiceReady = 220,
    GoodBye = 221,
    Ok = 250,
    StartMailInput = 354,
    Unavailable = 421,
    ActionUnavailable = 451,
    SyntaxError = 500,
    InvalidParameters = 501,
    NotImplemented = 502,
    InvalidCommandSequence = 503,
    ExceededStorage = 552,
}

impl Status {
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }
}

impl Display for Status {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(fmt, "{}", self.code())
    }
}

/// A complete SMTP reply, possibly spanning several lines
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    status: Status,
    lines: Vec<String>,
}

impl Reply {
    pub fn new(status: Status, line: impl Into<String>) -> Self {
        Self {
            status,
            lines: vec![line.into()],
        }
    }

    pub const fn multiline(status: Status, lines: Vec<String>) -> Self {
        Self { status, lines }
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }
}

impl Display for Reply {
    /// `250-first\r\n250 last`, without the trailing line break
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let last = self.lines.len().saturating_sub(1);

        if self.lines.is_empty() {
            return write!(fmt, "{}", self.status);
        }

        for (index, line) in self.lines.iter().enumerate() {
            if index == last {
                write!(fmt, "{} {line}", self.status)?;
            } else {
                write!(fmt, "{}-{line}\r\n", self.status)?;
            }
        }

        Ok(())
    }
}
