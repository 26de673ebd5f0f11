//! IMAP client for the source mailbox.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_imap::Session;
use async_native_tls::TlsConnector;
use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use secrecy::ExposeSecret;

use crate::config::{AttachmentFilter, ImapSettings, MailCredentials};
use crate::sanitize;

use super::error::{MailError, Result};
use super::parser::{Attachment, EmailParser};
use super::source::{MailSource, MessageRef};

/// Type alias for the underlying async stream (using async-std compatible TcpStream).
type AsyncTcpStream = async_io::Async<TcpStream>;

/// Type alias for the TLS stream used by the IMAP session.
type TlsStream = async_native_tls::TlsStream<AsyncTcpStream>;

/// IMAP-backed [`MailSource`].
///
/// Uses `UID SEARCH` and `UID FETCH ... RFC822`, so every fetched message is
/// marked `\Seen` and will not match the next run's `UNSEEN` search.
pub struct ImapMailSource {
    session: Option<Session<TlsStream>>,
    settings: ImapSettings,
}

impl ImapMailSource {
    pub fn new(settings: ImapSettings) -> Self {
        Self {
            session: None,
            settings,
        }
    }

    /// Checks if the client is currently connected.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn session(&mut self) -> Result<&mut Session<TlsStream>> {
        self.session.as_mut().ok_or(MailError::NotConnected)
    }

    async fn open_session(&self, credentials: &MailCredentials) -> Result<Session<TlsStream>> {
        let addr = format!("{}:{}", self.settings.host, self.settings.port);
        info!(
            "Connecting to IMAP server at {} as {}",
            addr,
            sanitize::redact_address(&credentials.username)
        );

        // The std connect blocks the runtime, so bound it directly.
        let std_stream = connect_tcp(&addr, self.settings.timeout)?;
        std_stream
            .set_nonblocking(true)
            .map_err(|e| MailError::ConnectionFailed(e.to_string()))?;
        let tcp_stream = async_io::Async::new(std_stream)
            .map_err(|e| MailError::ConnectionFailed(e.to_string()))?;

        let tls_stream = TlsConnector::new()
            .connect(&self.settings.host, tcp_stream)
            .await?;

        let client = async_imap::Client::new(tls_stream);

        client
            .login(&credentials.username, credentials.password.expose_secret())
            .await
            .map_err(|(e, _)| MailError::AuthenticationFailed(e.to_string()))
    }
}

/// The post-login steps of a session, split out so the select-or-logout
/// sequence does not depend on a live server.
#[async_trait(?Send)]
trait FolderSession {
    async fn select_folder(&mut self, folder: &str) -> std::result::Result<(), String>;
    async fn log_out(&mut self) -> std::result::Result<(), String>;
}

#[async_trait(?Send)]
impl FolderSession for Session<TlsStream> {
    async fn select_folder(&mut self, folder: &str) -> std::result::Result<(), String> {
        self.select(folder).await.map(|_| ()).map_err(|e| e.to_string())
    }

    async fn log_out(&mut self) -> std::result::Result<(), String> {
        self.logout().await.map_err(|e| e.to_string())
    }
}

/// Selects `folder`. On failure or timeout the authenticated session is
/// logged out before the error is returned.
async fn select_or_log_out<S: FolderSession>(
    session: &mut S,
    folder: &str,
    timeout: Duration,
) -> Result<()> {
    let failure = match tokio::time::timeout(timeout, session.select_folder(folder)).await {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(reason)) => MailError::FolderNotFound(format!("{} ({})", folder, reason)),
        Err(_) => MailError::Timeout(format!("selecting folder '{}'", folder)),
    };

    match tokio::time::timeout(timeout, session.log_out()).await {
        Ok(Ok(())) => debug!("Logged out after folder selection failed"),
        Ok(Err(e)) => warn!("Failed to log out after folder selection failed: {}", e),
        Err(_) => warn!("Timed out logging out after folder selection failed"),
    }
    Err(failure)
}

#[async_trait(?Send)]
impl MailSource for ImapMailSource {
    async fn connect(&mut self, credentials: &MailCredentials) -> Result<()> {
        if self.session.is_some() {
            debug!("Already connected to IMAP server");
            return Ok(());
        }

        let login = self.open_session(credentials);
        let mut session = tokio::time::timeout(self.settings.timeout, login)
            .await
            .map_err(|_| {
                MailError::Timeout(format!(
                    "connecting to {} took longer than {:?}",
                    self.settings.host, self.settings.timeout
                ))
            })??;

        select_or_log_out(&mut session, &self.settings.folder, self.settings.timeout).await?;

        info!(
            "Authenticated to IMAP server, folder '{}' selected",
            self.settings.folder
        );
        self.session = Some(session);
        Ok(())
    }

    async fn find_matching_messages(&mut self, sender_filter: &str) -> Result<Vec<MessageRef>> {
        let query = search_query(sender_filter);
        debug!("Searching with query: {}", query);

        let uids = self
            .session()?
            .uid_search(&query)
            .await
            .map_err(|e| MailError::SearchFailed(e.to_string()))?;

        let mut messages: Vec<MessageRef> = uids.into_iter().map(MessageRef).collect();
        messages.sort_unstable();

        debug!("Found {} messages matching search", messages.len());
        Ok(messages)
    }

    async fn fetch_attachments(
        &mut self,
        message: MessageRef,
        filter: &AttachmentFilter,
    ) -> Result<Vec<Attachment>> {
        let uid = message.uid();
        debug!("Fetching email with UID {}", uid);

        let fetch_failed = |reason: String| MailError::FetchFailed { uid, reason };

        // RFC822 (not BODY.PEEK[]) so the server sets \Seen.
        let mut responses = self
            .session()?
            .uid_fetch(uid.to_string(), "RFC822")
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;

        let mut raw_email = None;
        let mut stream_error = None;
        while let Some(response) = responses.next().await {
            match response {
                Ok(fetch) => {
                    if raw_email.is_none() {
                        raw_email = fetch.body().map(<[u8]>::to_vec);
                    }
                }
                Err(e) => {
                    warn!("Error reading fetch response for UID {}: {}", uid, e);
                    stream_error.get_or_insert_with(|| e.to_string());
                }
            }
        }
        drop(responses);

        let raw_email = match (raw_email, stream_error) {
            (Some(raw), _) => raw,
            (None, Some(reason)) => return Err(fetch_failed(reason)),
            (None, None) => return Err(fetch_failed("server returned no message body".to_string())),
        };

        EmailParser::new(filter).extract_attachments(&raw_email, uid)
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            info!("Disconnecting from IMAP server");
            session
                .logout()
                .await
                .map_err(|e| MailError::ProtocolError(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for ImapMailSource {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("ImapMailSource dropped without explicit disconnect - session will be closed");
        }
    }
}

/// Tries each resolved address in turn, each with `timeout`.
fn connect_tcp(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let candidates = addr
        .to_socket_addrs()
        .map_err(|e| MailError::ConnectionFailed(format!("cannot resolve {}: {}", addr, e)))?;

    let mut last_error = None;
    for candidate in candidates {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }

    Err(match last_error {
        Some(e) if e.kind() == std::io::ErrorKind::TimedOut => {
            MailError::Timeout(format!("connecting to {}", addr))
        }
        Some(e) => MailError::ConnectionFailed(e.to_string()),
        None => MailError::ConnectionFailed(format!("{} resolved to no addresses", addr)),
    })
}

/// Builds `UNSEEN FROM "<sender>"`, quoting the sender as an IMAP string.
fn search_query(sender_filter: &str) -> String {
    format!("UNSEEN FROM {}", quote_imap_string(sender_filter))
}

fn quote_imap_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
