//! Recording in-memory adapters for the mailbox and storage seams.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;

use mail2drive::config::{AttachmentFilter, DriveCredentials, MailCredentials};
use mail2drive::drive::DriveError;
use mail2drive::email::MailError;
use mail2drive::{Attachment, EmailParser, MailSource, MessageRef, RemoteFile, StorageSink};

/// A call observed by [`FakeMailbox`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailCall {
    Connect,
    Search(String),
    Fetch(u32),
    Disconnect,
}

enum StoredMessage {
    Raw { sender: String, raw: String },
    Unfetchable { sender: String },
}

impl StoredMessage {
    fn sender(&self) -> &str {
        match self {
            StoredMessage::Raw { sender, .. } | StoredMessage::Unfetchable { sender } => sender,
        }
    }
}

/// A mailbox keyed by UID. Fetching a message marks it seen, like a
/// non-peek IMAP fetch.
#[derive(Default)]
pub struct FakeMailbox {
    messages: BTreeMap<u32, StoredMessage>,
    unseen: BTreeSet<u32>,
    connected: bool,
    pub fail_connect: bool,
    pub fail_search: bool,
    pub calls: Vec<MailCall>,
}

impl FakeMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an unread message.
    pub fn deliver(&mut self, uid: u32, sender: &str, raw: String) {
        self.messages.insert(
            uid,
            StoredMessage::Raw {
                sender: sender.to_string(),
                raw,
            },
        );
        self.unseen.insert(uid);
    }

    /// Deliver an unread message whose fetch always fails.
    pub fn deliver_unfetchable(&mut self, uid: u32, sender: &str) {
        self.messages.insert(
            uid,
            StoredMessage::Unfetchable {
                sender: sender.to_string(),
            },
        );
        self.unseen.insert(uid);
    }

    pub fn mark_unread(&mut self, uid: u32) {
        if self.messages.contains_key(&uid) {
            self.unseen.insert(uid);
        }
    }

    pub fn is_unread(&self, uid: u32) -> bool {
        self.unseen.contains(&uid)
    }

    pub fn fetched_uids(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                MailCall::Fetch(uid) => Some(*uid),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

#[async_trait(?Send)]
impl MailSource for FakeMailbox {
    async fn connect(
        &mut self,
        _credentials: &MailCredentials,
    ) -> mail2drive::email::error::Result<()> {
        self.calls.push(MailCall::Connect);
        if self.fail_connect {
            return Err(MailError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ));
        }
        self.connected = true;
        Ok(())
    }

    async fn find_matching_messages(
        &mut self,
        sender_filter: &str,
    ) -> mail2drive::email::error::Result<Vec<MessageRef>> {
        self.calls.push(MailCall::Search(sender_filter.to_string()));
        if !self.connected {
            return Err(MailError::NotConnected);
        }
        if self.fail_search {
            return Err(MailError::SearchFailed("BAD search syntax".to_string()));
        }

        Ok(self
            .unseen
            .iter()
            .filter(|uid| {
                self.messages
                    .get(*uid)
                    .is_some_and(|m| m.sender() == sender_filter)
            })
            .map(|uid| MessageRef(*uid))
            .collect())
    }

    async fn fetch_attachments(
        &mut self,
        message: MessageRef,
        filter: &AttachmentFilter,
    ) -> mail2drive::email::error::Result<Vec<Attachment>> {
        let uid = message.uid();
        self.calls.push(MailCall::Fetch(uid));
        if !self.connected {
            return Err(MailError::NotConnected);
        }

        match self.messages.get(&uid) {
            Some(StoredMessage::Raw { raw, .. }) => {
                self.unseen.remove(&uid);
                EmailParser::new(filter).extract_attachments(raw.as_bytes(), uid)
            }
            Some(StoredMessage::Unfetchable { .. }) | None => Err(MailError::FetchFailed {
                uid,
                reason: "connection reset".to_string(),
            }),
        }
    }

    async fn disconnect(&mut self) -> mail2drive::email::error::Result<()> {
        self.calls.push(MailCall::Disconnect);
        self.connected = false;
        Ok(())
    }
}

/// A call observed by [`FakeDrive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveCall {
    Authenticate,
    Exists(String),
    Upload(String),
}

/// A file held by [`FakeDrive`].
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub folder_id: String,
    pub file: RemoteFile,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// A folder store with exact, case-sensitive name lookups.
#[derive(Default)]
pub struct FakeDrive {
    pub files: Vec<StoredFile>,
    pub fail_auth: bool,
    pub failing_uploads: HashSet<String>,
    pub calls: Vec<DriveCall>,
    authenticated: bool,
    next_id: u32,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate `folder_id` with a file named `name`.
    pub fn seed(&mut self, folder_id: &str, name: &str) {
        let file = self.allocate(name);
        self.files.push(StoredFile {
            folder_id: folder_id.to_string(),
            file,
            mime_type: "text/csv".to_string(),
            content: Vec::new(),
        });
    }

    /// Names of files in `folder_id`, in creation order.
    pub fn names_in(&self, folder_id: &str) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.folder_id == folder_id)
            .map(|f| f.file.name.clone())
            .collect()
    }

    pub fn upload_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DriveCall::Upload(_)))
            .count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn allocate(&mut self, name: &str) -> RemoteFile {
        self.next_id += 1;
        RemoteFile {
            id: format!("file-{}", self.next_id),
            name: name.to_string(),
        }
    }
}

#[async_trait(?Send)]
impl StorageSink for FakeDrive {
    async fn authenticate(
        &mut self,
        _credentials: &DriveCredentials,
    ) -> mail2drive::drive::error::Result<()> {
        self.calls.push(DriveCall::Authenticate);
        if self.fail_auth {
            return Err(DriveError::AuthenticationFailed(
                "refresh token has been revoked (invalid_grant)".to_string(),
            ));
        }
        self.authenticated = true;
        Ok(())
    }

    async fn file_exists(
        &mut self,
        folder_id: &str,
        file_name: &str,
    ) -> mail2drive::drive::error::Result<bool> {
        self.calls.push(DriveCall::Exists(file_name.to_string()));
        if !self.authenticated {
            return Err(DriveError::NotAuthenticated);
        }
        Ok(self
            .files
            .iter()
            .any(|f| f.folder_id == folder_id && f.file.name == file_name))
    }

    async fn upload(
        &mut self,
        folder_id: &str,
        file_name: &str,
        content: Vec<u8>,
        mime_type: &str,
    ) -> mail2drive::drive::error::Result<RemoteFile> {
        self.calls.push(DriveCall::Upload(file_name.to_string()));
        if !self.authenticated {
            return Err(DriveError::NotAuthenticated);
        }
        if self.failing_uploads.contains(file_name) {
            return Err(DriveError::UploadFailed {
                file_name: file_name.to_string(),
                reason: "HTTP 403: storage quota exceeded".to_string(),
            });
        }

        let file = self.allocate(file_name);
        self.files.push(StoredFile {
            folder_id: folder_id.to_string(),
            file: file.clone(),
            mime_type: mime_type.to_string(),
            content,
        });
        Ok(file)
    }
}
