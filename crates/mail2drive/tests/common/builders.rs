//! Builders for settings and raw messages used across integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use mail2drive::config::loader::{
    EMAIL_PASS, EMAIL_USER, GDRIVE_FOLDER_ID, GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET,
    GOOGLE_REFRESH_TOKEN, SENDER_FILTER,
};
use mail2drive::Settings;

pub const SENDER: &str = "reports@vendor.example";
pub const FOLDER_ID: &str = "folder-123";

/// Builder for `Settings` backed by an in-memory environment.
pub struct SettingsBuilder {
    vars: HashMap<String, String>,
}

impl SettingsBuilder {
    /// A complete environment with every required variable set.
    pub fn new() -> Self {
        let vars = [
            (EMAIL_USER, "inbox@example.com"),
            (EMAIL_PASS, "app-password"),
            (SENDER_FILTER, SENDER),
            (GDRIVE_FOLDER_ID, FOLDER_ID),
            (GOOGLE_CLIENT_ID, "client-id.apps.googleusercontent.com"),
            (GOOGLE_CLIENT_SECRET, "client-secret"),
            (GOOGLE_REFRESH_TOKEN, "1//refresh-token"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self { vars }
    }

    /// Set (or override) a variable.
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    /// Remove a variable.
    pub fn without(mut self, name: &str) -> Self {
        self.vars.remove(name);
        self
    }

    pub fn build(self) -> Settings {
        let lookup = |name: &str| self.vars.get(name).cloned();
        Settings::from_lookup(&lookup).expect("test environment should load")
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a `multipart/mixed` message with a text body and attachments.
pub struct EmailBuilder {
    from: String,
    subject: String,
    attachments: Vec<(String, String, String)>,
}

impl EmailBuilder {
    pub fn from(sender: &str) -> Self {
        Self {
            from: sender.to_string(),
            subject: "Daily export".to_string(),
            attachments: Vec::new(),
        }
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    /// Add a base64 attachment part with the given filename, type and bytes.
    pub fn attachment(
        mut self,
        filename: &str,
        mime_type: &str,
        content: impl AsRef<[u8]>,
    ) -> Self {
        self.attachments.push((
            filename.to_string(),
            mime_type.to_string(),
            STANDARD.encode(content),
        ));
        self
    }

    pub fn build(self) -> String {
        let mut raw = format!(
            "From: {}\r\n\
             To: inbox@example.com\r\n\
             Subject: {}\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
             \r\n\
             --b1\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             \r\n\
             Please find the export attached.\r\n",
            self.from, self.subject
        );

        for (filename, mime_type, encoded) in &self.attachments {
            raw.push_str(&format!(
                "--b1\r\n\
                 Content-Type: {}; name=\"{}\"\r\n\
                 Content-Disposition: attachment; filename=\"{}\"\r\n\
                 Content-Transfer-Encoding: base64\r\n\
                 \r\n\
                 {}\r\n",
                mime_type, filename, filename, encoded
            ));
        }

        raw.push_str("--b1--\r\n");
        raw
    }
}
