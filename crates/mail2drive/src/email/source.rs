//! The mailbox seam used by the transfer loop.

use async_trait::async_trait;

use crate::config::{AttachmentFilter, MailCredentials};

use super::error::Result;
use super::parser::Attachment;

/// Session-scoped handle to a message (its IMAP UID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageRef(pub u32);

impl MessageRef {
    pub fn uid(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for MessageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mailbox that can be searched for unread mail from a sender.
///
/// Calls are strictly sequential. `connect` must succeed before any other
/// method, and `disconnect` must be safe to call in any state.
#[async_trait(?Send)]
pub trait MailSource {
    /// Opens a secure session and logs in.
    async fn connect(&mut self, credentials: &MailCredentials) -> Result<()>;

    /// Returns unread messages from `sender_filter`, oldest first. An empty
    /// mailbox is `Ok(vec![])`.
    async fn find_matching_messages(&mut self, sender_filter: &str) -> Result<Vec<MessageRef>>;

    /// Fetches one message in full and returns its allowed attachments.
    ///
    /// Fetching the full message clears its unseen flag on the server.
    async fn fetch_attachments(
        &mut self,
        message: MessageRef,
        filter: &AttachmentFilter,
    ) -> Result<Vec<Attachment>>;

    /// Logs out. A no-op when not connected.
    async fn disconnect(&mut self) -> Result<()>;
}
