//! Secret resolution from the process environment.
//!
//! Every credential can be supplied in one of two ways:
//!
//! 1. **Env var** - the value itself (e.g., `EMAIL_PASS=abcd efgh ijkl mnop`)
//! 2. **File reference** - `<NAME>_FILE` pointing at a file that holds the
//!    value (e.g., `GOOGLE_REFRESH_TOKEN_FILE=/run/secrets/refresh_token`)
//!
//! The direct variable wins when both are set. Values are trimmed and an empty
//! value counts as absent.

use secrecy::SecretString;
use std::fs;

/// Suffix appended to a variable name to reference a file holding its value.
pub const FILE_SUFFIX: &str = "_FILE";

/// Looks up a single environment variable by name.
///
/// Production code passes a closure over `std::env::var`; tests pass a map.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Failed to read secret '{name}' from file '{path}': {source}")]
    FileReadError {
        name: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for secret resolution.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret named `name`, first from `name` itself and then from
/// the file referenced by `name_FILE`.
///
/// Returns `Ok(None)` when neither source yields a non-empty value. Missing
/// values are reported by configuration validation, not here.
///
/// # Examples
///
/// ```ignore
/// use mail2drive::secrets::resolve_secret;
///
/// let lookup = |name: &str| std::env::var(name).ok();
/// let password = resolve_secret(&lookup, "EMAIL_PASS")?;
/// ```
pub fn resolve_secret(lookup: EnvLookup<'_>, name: &str) -> Result<Option<SecretString>> {
    if let Some(value) = lookup(name) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(Some(SecretString::from(trimmed)));
        }
    }

    let file_var = format!("{}{}", name, FILE_SUFFIX);
    if let Some(path) = lookup(&file_var) {
        let path = path.trim();
        if !path.is_empty() {
            let expanded = expand_home(path);
            let content = fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
                name: name.to_string(),
                path: expanded.clone(),
                source: e,
            })?;
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                return Ok(Some(SecretString::from(trimmed)));
            }
        }
    }

    Ok(None)
}

/// Resolves a non-secret setting the same way as [`resolve_secret`], returning
/// the plain string.
pub fn resolve_value(lookup: EnvLookup<'_>, name: &str) -> Result<Option<String>> {
    use secrecy::ExposeSecret;

    Ok(resolve_secret(lookup, name)?.map(|s| s.expose_secret().to_string()))
}

/// Expands `~` to the user's home directory.
///
/// Checks HOME (Unix) then USERPROFILE (Windows). `~user/path` is not supported.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
