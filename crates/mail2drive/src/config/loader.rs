use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::config::schema::{
    AttachmentFilter, Config, DriveCredentials, ImapSettings, MailCredentials, DEFAULT_LOG_FILE,
};
use crate::error::ConfigError;
use crate::secrets::{resolve_secret, resolve_value, EnvLookup};

pub const EMAIL_USER: &str = "EMAIL_USER";
pub const EMAIL_PASS: &str = "EMAIL_PASS";
pub const SENDER_FILTER: &str = "SENDER_FILTER";
pub const GDRIVE_FOLDER_ID: &str = "GDRIVE_FOLDER_ID";
pub const GOOGLE_CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
pub const GOOGLE_CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
pub const GOOGLE_REFRESH_TOKEN: &str = "GOOGLE_REFRESH_TOKEN";

pub const IMAP_HOST: &str = "IMAP_HOST";
pub const IMAP_PORT: &str = "IMAP_PORT";
pub const IMAP_FOLDER: &str = "IMAP_FOLDER";
pub const NETWORK_TIMEOUT_SECS: &str = "NETWORK_TIMEOUT_SECS";
pub const ALLOWED_EXTENSIONS: &str = "ALLOWED_EXTENSIONS";
pub const LOG_FILE: &str = "LOG_FILE";

/// Loads a `.env` file from the working directory or one of its parents.
///
/// Variables already present in the process environment are kept. A missing
/// file is not an error; the loaded path is returned when one was found.
pub fn load_dotenv() -> Result<Option<PathBuf>, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(ConfigError::DotEnv(e.to_string())),
    }
}

/// Like [`load_dotenv`], for an explicit file. Returns whether it existed.
pub fn load_dotenv_from(path: &Path) -> Result<bool, ConfigError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(ConfigError::DotEnv(e.to_string())),
    }
}

/// Raw settings as read from the environment.
///
/// Required values are optional here; [`Settings::validate`] turns them into a
/// [`Config`] or reports every missing name at once. Reading settings never
/// touches the network.
#[derive(Debug)]
pub struct Settings {
    pub email_user: Option<String>,
    pub email_pass: Option<SecretString>,
    pub sender_filter: Option<String>,
    pub folder_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub imap: ImapSettings,
    pub attachments: AttachmentFilter,
    pub log_file: PathBuf,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |name: &str| std::env::var(name).ok();
        Self::from_lookup(&lookup)
    }

    /// Reads settings through `lookup`.
    ///
    /// Fails only on malformed optional values or unreadable `_FILE`
    /// references; absent required values are left as `None`.
    pub fn from_lookup(lookup: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let defaults = ImapSettings::default();

        let port = match resolve_value(lookup, IMAP_PORT)? {
            Some(raw) => raw.parse::<u16>().ok().filter(|p| *p != 0).ok_or_else(|| {
                ConfigError::Invalid {
                    name: IMAP_PORT,
                    reason: format!("'{}' is not a valid port", raw),
                }
            })?,
            None => defaults.port,
        };

        let timeout = match resolve_value(lookup, NETWORK_TIMEOUT_SECS)? {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| ConfigError::Invalid {
                    name: NETWORK_TIMEOUT_SECS,
                    reason: format!("'{}' is not a positive number of seconds", raw),
                })?,
            None => defaults.timeout,
        };

        let attachments = match resolve_value(lookup, ALLOWED_EXTENSIONS)? {
            Some(raw) => {
                let filter = AttachmentFilter::new(raw.split(','));
                if filter.is_empty() {
                    return Err(ConfigError::Invalid {
                        name: ALLOWED_EXTENSIONS,
                        reason: "no extensions listed".to_string(),
                    });
                }
                filter
            }
            None => AttachmentFilter::default(),
        };

        let imap = ImapSettings {
            host: resolve_value(lookup, IMAP_HOST)?.unwrap_or(defaults.host),
            port,
            folder: resolve_value(lookup, IMAP_FOLDER)?.unwrap_or(defaults.folder),
            timeout,
        };

        Ok(Self {
            email_user: resolve_value(lookup, EMAIL_USER)?,
            email_pass: resolve_secret(lookup, EMAIL_PASS)?,
            sender_filter: resolve_value(lookup, SENDER_FILTER)?,
            folder_id: resolve_value(lookup, GDRIVE_FOLDER_ID)?,
            client_id: resolve_value(lookup, GOOGLE_CLIENT_ID)?,
            client_secret: resolve_secret(lookup, GOOGLE_CLIENT_SECRET)?,
            refresh_token: resolve_secret(lookup, GOOGLE_REFRESH_TOKEN)?,
            imap,
            attachments,
            log_file: resolve_value(lookup, LOG_FILE)?
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        })
    }

    /// Names of required settings that are absent, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let present = [
            (EMAIL_USER, self.email_user.is_some()),
            (EMAIL_PASS, self.email_pass.is_some()),
            (SENDER_FILTER, self.sender_filter.is_some()),
            (GDRIVE_FOLDER_ID, self.folder_id.is_some()),
            (GOOGLE_CLIENT_ID, self.client_id.is_some()),
            (GOOGLE_CLIENT_SECRET, self.client_secret.is_some()),
            (GOOGLE_REFRESH_TOKEN, self.refresh_token.is_some()),
        ];

        present
            .into_iter()
            .filter(|(_, ok)| !ok)
            .map(|(name, _)| name)
            .collect()
    }

    /// Checks that every required value is present and builds the run's
    /// immutable [`Config`].
    pub fn validate(self) -> Result<Config, ConfigError> {
        match self {
            Settings {
                email_user: Some(username),
                email_pass: Some(password),
                sender_filter: Some(sender_filter),
                folder_id: Some(folder_id),
                client_id: Some(client_id),
                client_secret: Some(client_secret),
                refresh_token: Some(refresh_token),
                imap,
                attachments,
                log_file,
            } => Ok(Config {
                mail: MailCredentials { username, password },
                sender_filter,
                folder_id,
                drive: DriveCredentials {
                    client_id,
                    client_secret,
                    refresh_token,
                },
                imap,
                attachments,
                log_file,
            }),
            settings => Err(ConfigError::MissingFields {
                names: settings.missing_fields(),
            }),
        }
    }
}
