//! Email attachment source.
//!
//! Connects to an IMAP mailbox, finds unread messages from a configured sender
//! and extracts the attachments whose filenames pass the extension allowlist.

pub mod client;
pub mod error;
pub mod parser;
pub mod source;

pub use client::ImapMailSource;
pub use error::MailError;
pub use parser::{Attachment, AttachmentPart, EmailParser, MimePart};
pub use source::{MailSource, MessageRef};
