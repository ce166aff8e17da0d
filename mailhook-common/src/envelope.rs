use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::address::Participant;

/// Header lookup table with case-insensitive names.
///
/// Only the first value observed for a name is kept, later repeats of the
/// same header are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(AHashMap<String, String>);

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a header, unless one with the same name was already seen.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name.as_ref(), value);
        }
        headers
    }
}

/// A file carried by a message, extracted before the envelope reaches the relay.
///
/// `content` is the payload encoded as text (base64) so it survives JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub mime_type: String,
    pub file_name: String,
    pub content: String,
}

/// A single accepted mail transaction, as handed over by the transport.
///
/// Read-only once built.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    mail_from: Participant,
    rcpt_to: Arc<[Participant]>,
    headers: Headers,
    body: String,
    remote_addr: String,
    subject: String,
    attachments: Arc<[Attachment]>,
}

impl Envelope {
    /// Create a new [`EnvelopeBuilder`]
    #[must_use]
    pub fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::default()
    }

    #[inline]
    pub const fn mail_from(&self) -> &Participant {
        &self.mail_from
    }

    #[inline]
    pub fn rcpt_to(&self) -> &[Participant] {
        &self.rcpt_to
    }

    #[inline]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Look up a header by name, ignoring case.
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    #[inline]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Address of the peer that delivered this envelope
    #[inline]
    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    #[inline]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[inline]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

/// Builder for [`Envelope`]
#[derive(Debug, Default)]
pub struct EnvelopeBuilder {
    mail_from: Participant,
    rcpt_to: Vec<Participant>,
    headers: Headers,
    body: String,
    remote_addr: String,
    subject: String,
    attachments: Vec<Attachment>,
}

impl EnvelopeBuilder {
    #[must_use]
    pub fn with_mail_from(mut self, sender: Participant) -> Self {
        self.mail_from = sender;
        self
    }

    #[must_use]
    pub fn with_rcpt_to(mut self, recipients: Vec<Participant>) -> Self {
        self.rcpt_to = recipients;
        self
    }

    #[must_use]
    pub fn with_recipient(mut self, recipient: Participant) -> Self {
        self.rcpt_to.push(recipient);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, remote_addr: impl Into<String>) -> Self {
        self.remote_addr = remote_addr.into();
        self
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    #[must_use]
    pub fn build(self) -> Envelope {
        Envelope {
            mail_from: self.mail_from,
            rcpt_to: self.rcpt_to.into(),
            headers: self.headers,
            body: self.body,
            remote_addr: self.remote_addr,
            subject: self.subject,
            attachments: self.attachments.into(),
        }
    }
}
