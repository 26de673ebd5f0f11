//! Storage sink error types.

use thiserror::Error;

/// Errors that can occur while talking to Google Drive.
#[derive(Error, Debug)]
pub enum DriveError {
    /// The refresh token was rejected or the token endpoint was unreachable.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A Drive call was made before `authenticate`.
    #[error("Not authenticated with Google Drive")]
    NotAuthenticated,

    /// The HTTP client could not be built.
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),

    /// Listing the folder for an existing file failed.
    #[error("Failed to look up '{file_name}': {reason}")]
    QueryFailed { file_name: String, reason: String },

    /// Creating the file failed (quota, permission, network).
    #[error("Failed to upload '{file_name}': {reason}")]
    UploadFailed { file_name: String, reason: String },
}

/// Result type for Drive operations.
pub type Result<T> = std::result::Result<T, DriveError>;
