use std::fmt;

use crate::drive::RemoteFile;

/// Outcome of a run that got past the fatal stages.
///
/// Isolated failures are counted here rather than returned as errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    /// Unread messages from the sender found by the search.
    pub messages_found: usize,
    /// Messages fetched and parsed successfully.
    pub messages_processed: usize,
    /// Messages whose fetch or parse failed.
    pub messages_failed: usize,
    /// Files created in the target folder, in upload order.
    pub uploaded: Vec<RemoteFile>,
    /// Attachments skipped because the name already existed.
    pub skipped_existing: usize,
    /// Attachments whose existence check or upload failed.
    pub upload_failures: usize,
}

impl TransferSummary {
    pub fn new(messages_found: usize) -> Self {
        Self {
            messages_found,
            ..Self::default()
        }
    }

    /// True when nothing was found to process.
    pub fn is_empty(&self) -> bool {
        self.messages_found == 0
    }

    /// True when every message and attachment went through without error.
    pub fn is_clean(&self) -> bool {
        self.messages_failed == 0 && self.upload_failures == 0
    }
}

impl fmt::Display for TransferSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} messages ({} failed), {} uploaded, {} already present, {} failed uploads",
            self.messages_found,
            self.messages_failed,
            self.uploaded.len(),
            self.skipped_existing,
            self.upload_failures
        )
    }
}
