pub mod config;
pub mod drive;
pub mod email;
pub mod error;
pub mod logging;
pub mod sanitize;
pub mod secrets;
pub mod transfer;

pub use config::{AttachmentFilter, Config, Settings};
pub use drive::{DriveError, DriveStorage, RemoteFile, StorageSink};
pub use email::{Attachment, EmailParser, ImapMailSource, MailError, MailSource, MessageRef};
pub use error::{ConfigError, Result, TransferError};
pub use secrets::{resolve_secret, resolve_value, SecretError};
pub use transfer::{run, run_with_config, TransferSummary};
