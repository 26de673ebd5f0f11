//! Email parsing and attachment extraction.
//!
//! A fetched message is parsed with `mail-parser` and converted into a typed
//! [`MimePart`] tree. Only [`MimePart::Attachment`] leaves are ever considered
//! for upload, and only when their filename passes the [`AttachmentFilter`].

use std::borrow::Cow;

use log::debug;
use mail_parser::decoders::base64::base64_decode;
use mail_parser::decoders::quoted_printable::quoted_printable_decode;
use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};

use crate::config::AttachmentFilter;

use super::error::{MailError, Result};

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// An attachment ready to be uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Filename as declared by the sender (RFC 2047 decoded, not sanitized).
    pub filename: String,
    /// Transfer-decoded payload.
    pub content: Vec<u8>,
    /// Declared content type, or a guess from the filename.
    pub mime_type: String,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content.len", &self.content.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// A node in a message's MIME structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimePart<'a> {
    /// `multipart/*` or an embedded `message/rfc822`.
    Container(Vec<MimePart<'a>>),
    /// A leaf without a Content-Disposition header, such as the message body.
    Inline,
    /// A leaf that declares a Content-Disposition.
    Attachment(AttachmentPart<'a>),
}

/// Leaf data of a [`MimePart::Attachment`], borrowed from the parsed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPart<'a> {
    pub filename: Option<String>,
    pub mime_type: String,
    /// Payload with only the Content-Transfer-Encoding removed.
    pub content: Cow<'a, [u8]>,
}

impl<'a> MimePart<'a> {
    /// Builds the tree rooted at the message's top-level part.
    pub fn from_message(message: &'a Message<'_>) -> Self {
        Self::from_part_id(message, 0)
    }

    fn from_part_id(message: &'a Message<'_>, id: usize) -> Self {
        let Some(part) = message.parts.get(id) else {
            return MimePart::Inline;
        };

        match &part.body {
            PartType::Multipart(children) => MimePart::Container(
                children
                    .iter()
                    .map(|child| Self::from_part_id(message, *child as usize))
                    .collect(),
            ),
            PartType::Message(nested) => MimePart::Container(vec![Self::from_message(nested)]),
            _ => {
                if part.content_disposition().is_none() {
                    return MimePart::Inline;
                }

                let filename = part
                    .attachment_name()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
                let mime_type = mime_type_of(part, filename.as_deref());

                MimePart::Attachment(AttachmentPart {
                    filename,
                    mime_type,
                    content: payload(message, part),
                })
            }
        }
    }

    /// Returns every attachment leaf in document order.
    pub fn attachments(&self) -> Vec<&AttachmentPart<'a>> {
        let mut found = Vec::new();
        let mut stack = vec![self];

        while let Some(node) = stack.pop() {
            match node {
                MimePart::Container(children) => stack.extend(children.iter().rev()),
                MimePart::Inline => {}
                MimePart::Attachment(part) => found.push(part),
            }
        }

        found
    }
}

/// Extracts allowed attachments from raw RFC 822 messages.
pub struct EmailParser<'f> {
    filter: &'f AttachmentFilter,
}

impl<'f> EmailParser<'f> {
    pub fn new(filter: &'f AttachmentFilter) -> Self {
        Self { filter }
    }

    /// Parses `raw_email` and returns the attachments whose filename passes
    /// the filter. Parts without a filename are skipped.
    pub fn extract_attachments(&self, raw_email: &[u8], uid: u32) -> Result<Vec<Attachment>> {
        let message = MessageParser::default().parse(raw_email).ok_or_else(|| {
            MailError::ParseError(format!("message UID {} is not a valid RFC 822 message", uid))
        })?;

        debug!(
            "Parsing email UID={} subject={:?}",
            uid,
            message.subject().unwrap_or("(no subject)")
        );

        let tree = MimePart::from_message(&message);
        let mut attachments = Vec::new();

        for part in tree.attachments() {
            let Some(filename) = part.filename.as_deref() else {
                debug!("Skipping unnamed {} attachment in UID {}", part.mime_type, uid);
                continue;
            };

            if !self.filter.allows(filename) {
                debug!("Attachment '{}' filtered out by extension", filename);
                continue;
            }

            debug!(
                "Found attachment: {} ({}, {} bytes)",
                filename,
                part.mime_type,
                part.content.len()
            );

            attachments.push(Attachment {
                filename: filename.to_string(),
                content: part.content.to_vec(),
                mime_type: part.mime_type.clone(),
            });
        }

        debug!(
            "Extracted {} attachments from email UID={}",
            attachments.len(),
            uid
        );
        Ok(attachments)
    }
}

/// Leaf payload as sent, minus the transfer encoding.
///
/// `mail-parser` converts text parts to UTF-8 using their charset, so text
/// leaves are re-read from the raw message instead. Binary leaves are already
/// transfer-decoded only.
fn payload<'a>(message: &'a Message<'_>, part: &'a MessagePart<'_>) -> Cow<'a, [u8]> {
    match &part.body {
        PartType::Text(_) | PartType::Html(_) => raw_payload(message, part).unwrap_or_else(|| {
            debug!("Falling back to decoded text for part with bad transfer encoding");
            Cow::Borrowed(body_bytes(&part.body))
        }),
        body => Cow::Borrowed(body_bytes(body)),
    }
}

fn raw_payload<'a>(message: &'a Message<'_>, part: &MessagePart<'_>) -> Option<Cow<'a, [u8]>> {
    let start = part.raw_body_offset() as usize;
    let end = part.raw_end_offset() as usize;
    let raw = message.raw_message().get(start..end)?;

    let encoding = part
        .content_transfer_encoding()
        .map(|e| e.trim().to_ascii_lowercase());

    match encoding.as_deref() {
        Some("base64") => base64_decode(raw).map(Cow::Owned),
        Some("quoted-printable") => quoted_printable_decode(raw).map(Cow::Owned),
        _ => Some(Cow::Borrowed(raw)),
    }
}

fn body_bytes<'a>(body: &'a PartType<'_>) -> &'a [u8] {
    match body {
        PartType::Text(text) | PartType::Html(text) => text.as_bytes(),
        PartType::Binary(data) | PartType::InlineBinary(data) => data.as_ref(),
        PartType::Message(_) | PartType::Multipart(_) => &[],
    }
}

/// Declared `type/subtype`, else a guess from the filename, else octet-stream.
fn mime_type_of(part: &MessagePart<'_>, filename: Option<&str>) -> String {
    part.content_type()
        .map(|ct| match ct.subtype() {
            Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
            None => ct.ctype().to_string(),
        })
        .map(|mime| mime.to_lowercase())
        .or_else(|| {
            filename
                .and_then(|name| mime_guess::from_path(name).first_raw())
                .map(str::to_string)
        })
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string())
}
