use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_IMAP_HOST: &str = "imap.gmail.com";
pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_IMAP_FOLDER: &str = "INBOX";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_FILE: &str = "attachment_uploader.log";
pub const DEFAULT_EXTENSIONS: &[&str] = &[".csv", ".xlsx"];

/// Validated, immutable configuration for a single run.
///
/// Built once by [`Settings::validate`](super::Settings::validate) and passed by
/// reference into each component.
#[derive(Debug)]
pub struct Config {
    pub mail: MailCredentials,
    pub sender_filter: String,
    pub folder_id: String,
    pub drive: DriveCredentials,
    pub imap: ImapSettings,
    pub attachments: AttachmentFilter,
    pub log_file: PathBuf,
}

/// Mailbox login credentials.
#[derive(Debug)]
pub struct MailCredentials {
    pub username: String,
    /// Account password or app password.
    pub password: SecretString,
}

/// OAuth2 client credentials plus a long-lived refresh token.
#[derive(Debug)]
pub struct DriveCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
}

impl Clone for DriveCredentials {
    fn clone(&self) -> Self {
        Self {
            client_id: self.client_id.clone(),
            client_secret: SecretString::from(self.client_secret.expose_secret()),
            refresh_token: SecretString::from(self.refresh_token.expose_secret()),
        }
    }
}

/// Where and how to reach the IMAP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImapSettings {
    pub host: String,
    pub port: u16,
    pub folder: String,
    /// Upper bound on TCP connect, TLS handshake and login together.
    pub timeout: Duration,
}

impl Default for ImapSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_IMAP_HOST.to_string(),
            port: DEFAULT_IMAP_PORT,
            folder: DEFAULT_IMAP_FOLDER.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Filename-extension allowlist for attachments.
///
/// Extensions are stored lowercased with a leading dot. Matching lowercases the
/// filename, so `REPORT.CSV` passes a `.csv` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFilter {
    extensions: Vec<String>,
}

impl AttachmentFilter {
    /// Builds a filter from user-supplied extensions, normalizing case and the
    /// leading dot. Blank entries are dropped.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .filter_map(|ext| {
                let ext = ext.as_ref().trim().to_lowercase();
                match ext.as_str() {
                    "" | "." => None,
                    e if e.starts_with('.') => Some(ext),
                    _ => Some(format!(".{}", ext)),
                }
            })
            .collect();

        Self { extensions }
    }

    /// Returns true if `filename` ends with one of the allowed extensions.
    pub fn allows(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        self.extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl Default for AttachmentFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}
