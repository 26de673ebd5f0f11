//! Mail source error types.

use thiserror::Error;

/// Errors that can occur while talking to the mailbox.
#[derive(Error, Debug)]
pub enum MailError {
    /// Failed to connect to the IMAP server.
    #[error("IMAP connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS/SSL error during connection.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// The server rejected the credentials.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// IMAP protocol error outside of search and fetch.
    #[error("IMAP protocol error: {0}")]
    ProtocolError(String),

    /// The configured folder could not be selected.
    #[error("IMAP folder '{0}' not found")]
    FolderNotFound(String),

    /// The server rejected the search query.
    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// A single message could not be retrieved.
    #[error("Failed to fetch message UID {uid}: {reason}")]
    FetchFailed { uid: u32, reason: String },

    /// Failed to parse a fetched message.
    #[error("Failed to parse email: {0}")]
    ParseError(String),

    /// An operation needed a session but none is open.
    #[error("Not connected to the IMAP server")]
    NotConnected,

    /// Operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl From<async_native_tls::Error> for MailError {
    fn from(err: async_native_tls::Error) -> Self {
        MailError::TlsError(err.to_string())
    }
}

/// Result type for mail operations.
pub type Result<T> = std::result::Result<T, MailError>;
