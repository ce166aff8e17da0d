//! Turning the raw DATA payload of a transaction into an [`Envelope`].

use std::net::IpAddr;

use base64::{Engine, prelude::BASE64_STANDARD};
use mailhook_common::{Attachment, Envelope, Headers, Participant};
use mailparse::{DispositionType, ParsedMail};
use tracing::warn;

/// Build the envelope for one accepted transaction.
///
/// A payload that is not a parseable message still yields an envelope: the
/// body is kept, headers and attachments stay empty.
pub fn assemble(
    sender: Participant,
    recipients: Vec<Participant>,
    data: &[u8],
    remote: IpAddr,
) -> Envelope {
    let builder = Envelope::builder()
        .with_mail_from(sender)
        .with_rcpt_to(recipients)
        .with_body(String::from_utf8_lossy(data))
        .with_remote_addr(remote.to_string());

    match mailparse::parse_mail(data) {
        Ok(parsed) => {
            let headers = parsed
                .get_headers()
                .into_iter()
                .map(|header| (header.get_key(), header.get_value()))
                .collect::<Headers>();
            let subject = headers.get("subject").unwrap_or_default().to_string();

            let mut attachments = Vec::new();
            collect_attachments(&parsed, &mut attachments);

            builder
                .with_headers(headers)
                .with_subject(subject)
                .with_attachments(attachments)
                .build()
        }
        Err(err) => {
            warn!("Unable to parse message from {remote}: {err}");
            builder.build()
        }
    }
}

/// Every part marked `Content-Disposition: attachment`, depth first.
fn collect_attachments(part: &ParsedMail<'_>, attachments: &mut Vec<Attachment>) {
    let disposition = part.get_content_disposition();

    if disposition.disposition == DispositionType::Attachment {
        match part.get_body_raw() {
            Ok(content) => attachments.push(Attachment {
                mime_type: part.ctype.mimetype.clone(),
                file_name: disposition
                    .params
                    .get("filename")
                    .or_else(|| part.ctype.params.get("name"))
                    .cloned()
                    .unwrap_or_default(),
                content: BASE64_STANDARD.encode(content),
            }),
            Err(err) => warn!("Skipping undecodable attachment: {err}"),
        }
    }

    for subpart in &part.subparts {
        collect_attachments(subpart, attachments);
    }
}
