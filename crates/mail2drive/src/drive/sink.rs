//! The storage seam used by the transfer loop.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::DriveCredentials;

use super::error::Result;

/// A file as known to the storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

/// A folder-based file store with name lookups.
///
/// `authenticate` must succeed before `file_exists` or `upload`. The
/// check-then-create pair is not atomic: two concurrent runs can both see a
/// name as absent and both create it.
#[async_trait(?Send)]
pub trait StorageSink {
    /// Obtains (or refreshes) credentials for the following calls.
    async fn authenticate(&mut self, credentials: &DriveCredentials) -> Result<()>;

    /// True if a non-trashed file named exactly `file_name` is in `folder_id`.
    /// The comparison is case-sensitive and does not normalize whitespace.
    async fn file_exists(&mut self, folder_id: &str, file_name: &str) -> Result<bool>;

    /// Creates `file_name` in `folder_id` with the given bytes and MIME type.
    async fn upload(
        &mut self,
        folder_id: &str,
        file_name: &str,
        content: Vec<u8>,
        mime_type: &str,
    ) -> Result<RemoteFile>;
}
