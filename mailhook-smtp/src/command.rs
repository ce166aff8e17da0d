use core::fmt::{self, Display, Formatter};

use mailhook_common::Participant;
use mailparse::MailAddr;

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum HeloVariant {
    Ehlo(String),
    Helo(String),
}

impl HeloVariant {
    pub fn id(&self) -> &str {
        match self {
            Self::Ehlo(id) | Self::Helo(id) => id,
        }
    }
}

impl Display for HeloVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ehlo(_) => "EHLO",
            Self::Helo(_) => "HELO",
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Command {
    Helo(HeloVariant),
    /// The null reverse-path `<>` is kept as an empty participant.
    MailFrom(Participant),
    RcptTo(Participant),
    Data,
    Rset,
    Noop,
    Quit,
    /// A known command with arguments that could not be understood
    Invalid(String),
    /// Anything that is not a command we know about
    Unknown(String),
}

impl Display for Command {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Helo(variant) => write!(fmt, "{variant} {}", variant.id()),
            Self::MailFrom(from) => write!(fmt, "MAIL FROM:<{}>", path(from)),
            Self::RcptTo(to) => write!(fmt, "RCPT TO:<{}>", path(to)),
            Self::Data => fmt.write_str("DATA"),
            Self::Rset => fmt.write_str("RSET"),
            Self::Noop => fmt.write_str("NOOP"),
            Self::Quit => fmt.write_str("QUIT"),
            Self::Invalid(s) | Self::Unknown(s) => fmt.write_str(s),
        }
    }
}

fn path(participant: &Participant) -> String {
    if participant.user.is_empty() && participant.host.is_empty() {
        String::new()
    } else {
        participant.to_string()
    }
}

/// Strip `prefix` from `command`, ignoring ASCII case.
fn strip_prefix_ignore_case<'a>(command: &'a str, prefix: &str) -> Option<&'a str> {
    command
        .get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &command[prefix.len()..])
}

/// Parse the path argument of `MAIL FROM`/`RCPT TO`.
///
/// ESMTP parameters after the path are accepted and ignored.
fn parse_path(argument: &str) -> Result<Participant, String> {
    let path = argument.split_whitespace().next().unwrap_or_default();

    if path.is_empty() {
        return Err("Expected an address".to_string());
    }

    // mailparse rejects the null path
    if path == "<>" {
        return Ok(Participant::default());
    }

    let addresses = mailparse::addrparse(path).map_err(|err| err.to_string())?;
    match addresses.first() {
        Some(MailAddr::Single(info)) => Ok(Participant::split(&info.addr)),
        Some(MailAddr::Group(_)) => Err(format!("Group addresses are not accepted: {path}")),
        None => Err(format!("Expected an address in {path}")),
    }
}

impl From<&str> for Command {
    fn from(command: &str) -> Self {
        let trimmed = command.trim();

        if let Some(rest) = strip_prefix_ignore_case(trimmed, "MAIL FROM:") {
            return parse_path(rest).map_or_else(Self::Invalid, Self::MailFrom);
        }

        if let Some(rest) = strip_prefix_ignore_case(trimmed, "RCPT TO:") {
            return parse_path(rest).map_or_else(Self::Invalid, Self::RcptTo);
        }

        let (verb, argument) = trimmed
            .split_once(' ')
            .map_or((trimmed, ""), |(verb, argument)| (verb, argument.trim()));

        if verb.eq_ignore_ascii_case("HELO") || verb.eq_ignore_ascii_case("EHLO") {
            if argument.is_empty() {
                return Self::Invalid(format!("Expected hostname in {trimmed}"));
            }

            let id = argument.to_string();
            return Self::Helo(if verb.eq_ignore_ascii_case("HELO") {
                HeloVariant::Helo(id)
            } else {
                HeloVariant::Ehlo(id)
            });
        }

        if verb.eq_ignore_ascii_case("NOOP") {
            Self::Noop
        } else if !argument.is_empty() {
            Self::Unknown(trimmed.to_string())
        } else if verb.eq_ignore_ascii_case("DATA") {
            Self::Data
        } else if verb.eq_ignore_ascii_case("QUIT") {
            Self::Quit
        } else if verb.eq_ignore_ascii_case("RSET") {
            Self::Rset
        } else {
            Self::Unknown(trimmed.to_string())
        }
    }
}

impl From<&[u8]> for Command {
    fn from(command: &[u8]) -> Self {
        std::str::from_utf8(command).map_or_else(
            |_| Self::Invalid("Unable to interpret command".to_string()),
            Self::from,
        )
    }
}
