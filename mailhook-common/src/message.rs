//! The canonical message relayed to the webhook.
//!
//! A [`CanonicalMessage`] is built from exactly one [`Envelope`] and is
//! complete before any delivery starts. Construction never fails: every field
//! falls back to an empty value when the envelope has nothing for it.

use serde::{Deserialize, Serialize};

use crate::{
    address::{self, Participant},
    envelope::{Attachment, Envelope},
    internal,
};

/// Separator used by `Cc` and `Bcc` header lists.
const LIST_SEPARATOR: &str = ", ";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMessage {
    #[serde(rename = "message_id")]
    pub id: String,
    pub sender: String,
    pub from: String,
    pub recipients: Vec<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub date: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub has_attachments: bool,
    pub attachments: Vec<Attachment>,
    pub body: String,
}

impl CanonicalMessage {
    /// Map an envelope onto the wire message.
    ///
    /// `recipients` and `to` carry the same list; receivers of the webhook
    /// read either one. A missing `Cc`/`Bcc` header yields `[""]`, not `[]`.
    pub fn from_envelope(envelope: &Envelope) -> Self {
        let to = address::normalize_all(envelope.rcpt_to());

        internal!(
            level = INFO,
            "New email titled: {} for {}",
            envelope.subject(),
            to.join(", ")
        );

        let from = envelope.mail_from().normalize();
        let header = |name: &str| envelope.header(name).unwrap_or_default().to_string();
        let attachments = envelope.attachments().to_vec();

        Self {
            id: header("Message-Id"),
            sender: compose_sender(envelope.mail_from(), envelope.remote_addr()),
            from,
            recipients: to.clone(),
            to,
            cc: split_list(envelope.header("Cc").unwrap_or_default()),
            bcc: split_list(envelope.header("Bcc").unwrap_or_default()),
            subject: envelope.subject().to_string(),
            date: header("Date"),
            content_type: header("Content-Type"),
            has_attachments: !attachments.is_empty(),
            attachments,
            body: envelope.body().to_string(),
        }
    }
}

impl From<&Envelope> for CanonicalMessage {
    fn from(envelope: &Envelope) -> Self {
        Self::from_envelope(envelope)
    }
}

/// `user@host(remote)`, the remote part is kept even when empty.
fn compose_sender(sender: &Participant, remote_addr: &str) -> String {
    format!("{sender}({remote_addr})")
}

fn split_list(value: &str) -> Vec<String> {
    value.split(LIST_SEPARATOR).map(str::to_string).collect()
}
