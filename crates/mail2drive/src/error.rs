use thiserror::Error;

use crate::drive::DriveError;
use crate::email::MailError;
use crate::secrets::SecretError;

/// Errors that abort a whole transfer run.
///
/// Per-message and per-attachment failures never appear here; the transfer
/// loop logs them and moves on.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Drive error: {0}")]
    Drive(#[from] DriveError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: {}", names.join(", "))]
    MissingFields { names: Vec<&'static str> },

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Failed to read .env file: {0}")]
    DotEnv(String),

    #[error(transparent)]
    Secret(#[from] SecretError),
}

pub type Result<T> = std::result::Result<T, TransferError>;
