//! Google Drive storage sink.
//!
//! Authenticates with a refresh token, checks a folder for an existing file by
//! exact name, and creates new files with a multipart upload.

pub mod auth;
pub mod client;
pub mod error;
pub mod sink;

pub use auth::{AccessToken, TokenRefresher};
pub use client::{DriveEndpoints, DriveStorage};
pub use error::DriveError;
pub use sink::{RemoteFile, StorageSink};
