use core::fmt::{self, Display, Formatter};
use std::sync::Arc;

use mailhook_common::{Participant, traits::FiniteStateMachine};

use crate::{
    command::{Command, HeloVariant},
    status::{Reply, Status},
};

/// Where a session is within the SMTP dialogue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum State {
    /// Greeting sent, waiting for HELO/EHLO
    #[default]
    Connect,
    /// Client identified, no transaction open
    Ready,
    /// `MAIL FROM` accepted
    MailFrom,
    /// At least one `RCPT TO` accepted
    RcptTo,
    /// `DATA` accepted, the message content follows
    Reading,
    /// Client issued QUIT
    Quit,
}

impl Display for State {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        fmt.write_str(match self {
            Self::Connect => "Connect",
            Self::Ready => "Ready",
            Self::MailFrom => "MAIL",
            Self::RcptTo => "RCPT",
            Self::Reading => "DATA",
            Self::Quit => "QUIT",
        })
    }
}

/// Everything collected for the transaction in progress, plus the reply
/// for the last command
#[derive(Debug, Default)]
pub struct Context {
    pub banner: Arc<str>,
    pub max_message_size: usize,
    /// Name the client gave in HELO/EHLO
    pub id: String,
    pub sender: Option<Participant>,
    pub recipients: Vec<Participant>,
    pub reply: Option<Reply>,
}

impl Context {
    pub fn new(banner: Arc<str>, max_message_size: usize) -> Self {
        Self {
            banner,
            max_message_size,
            ..Self::default()
        }
    }

    /// Drop the transaction, keeping the client identity
    pub fn reset(&mut self) {
        self.sender = None;
        self.recipients.clear();
    }

    fn respond(&mut self, status: Status, message: impl Into<String>) {
        self.reply = Some(Reply::new(status, message));
    }

    fn greet(&mut self, helo: &HeloVariant) {
        let greeting = format!("{} greets {}", self.banner, helo.id());

        self.reply = Some(match helo {
            HeloVariant::Helo(_) => Reply::new(Status::Ok, greeting),
            HeloVariant::Ehlo(_) => {
                let mut lines = vec![greeting, "8BITMIME".to_string()];
                if self.max_message_size > 0 {
                    lines.push(format!("SIZE {}", self.max_message_size));
                }
                Reply::multiline(Status::Ok, lines)
            }
        });
    }
}

impl FiniteStateMachine for State {
    type Input = Command;
    type Context = Context;

    fn transition(self, command: Command, ctx: &mut Context) -> Self {
        match (self, command) {
            (Self::Reading, _) => {
                ctx.respond(Status::InvalidCommandSequence, "Bad sequence of commands");
                self
            }

            (_, Command::Quit) => {
                ctx.respond(Status::GoodBye, "Bye");
                Self::Quit
            }

            (_, Command::Noop) => {
                ctx.respond(Status::Ok, "Ok");
                self
            }

            (_, Command::Unknown(_)) => {
                ctx.respond(Status::NotImplemented, "Command not implemented");
                self
            }

            (_, Command::Invalid(reason)) => {
                ctx.respond(Status::InvalidParameters, reason);
                self
            }

            (_, Command::Helo(helo)) => {
                ctx.reset();
                ctx.id = helo.id().to_string();
                ctx.greet(&helo);
                Self::Ready
            }

            (Self::Connect, Command::Rset) => {
                ctx.respond(Status::Ok, "Ok");
                Self::Connect
            }

            (_, Command::Rset) => {
                ctx.reset();
                ctx.respond(Status::Ok, "Ok");
                Self::Ready
            }

            (Self::Connect, _) => {
                ctx.respond(Status::InvalidCommandSequence, "Send HELO/EHLO first");
                Self::Connect
            }

            (Self::Ready, Command::MailFrom(sender)) => {
                ctx.sender = Some(sender);
                ctx.respond(Status::Ok, "Ok");
                Self::MailFrom
            }

            (Self::MailFrom | Self::RcptTo, Command::MailFrom(_)) => {
                ctx.respond(Status::InvalidCommandSequence, "Nested MAIL command");
                self
            }

            (Self::MailFrom | Self::RcptTo, Command::RcptTo(recipient)) => {
                ctx.recipients.push(recipient);
                ctx.respond(Status::Ok, "Ok");
                Self::RcptTo
            }

            (Self::RcptTo, Command::Data) => {
                ctx.respond(
                    Status::StartMailInput,
                    "End data with <CR><LF>.<CR><LF>",
                );
                Self::Reading
            }

            (Self::MailFrom, Command::Data) => {
                ctx.respond(Status::InvalidCommandSequence, "Need RCPT before DATA");
                self
            }

            (state, _) => {
                ctx.respond(Status::InvalidCommandSequence, "Need MAIL command");
                state
            }
        }
    }
}
