//! Google Drive v3 REST client.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DriveCredentials;
use crate::sanitize::truncate_body;

use super::auth::{AccessToken, TokenRefresher, GOOGLE_TOKEN_URL};
use super::error::{DriveError, Result};
use super::sink::{RemoteFile, StorageSink};

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Default connect timeout for HTTP requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout for HTTP requests, uploads included (60 seconds).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Base URLs for the token, metadata and upload endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveEndpoints {
    pub api_base: String,
    pub upload_base: String,
    pub token_url: String,
}

impl Default for DriveEndpoints {
    fn default() -> Self {
        Self {
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: DRIVE_UPLOAD_BASE.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }
}

/// Names listed per page when looking for an existing file.
const LIST_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct FileMetadata<'a> {
    name: &'a str,
    parents: [&'a str; 1],
}

struct Authorization {
    credentials: DriveCredentials,
    token: AccessToken,
}

/// [`StorageSink`] backed by the Google Drive v3 API.
pub struct DriveStorage {
    http: Client,
    endpoints: DriveEndpoints,
    refresher: TokenRefresher,
    auth: Option<Authorization>,
}

/// Creates an HTTP client with appropriate timeouts.
fn create_http_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| DriveError::HttpClient(e.to_string()))
}

impl DriveStorage {
    /// Creates a client for the public Google endpoints.
    pub fn new() -> Result<Self> {
        Self::with_endpoints(DriveEndpoints::default())
    }

    pub fn with_endpoints(endpoints: DriveEndpoints) -> Result<Self> {
        let http = create_http_client()?;
        let refresher = TokenRefresher::new(http.clone(), endpoints.token_url.clone());

        Ok(Self {
            http,
            endpoints,
            refresher,
            auth: None,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Refreshes the access token if it has expired since `authenticate`.
    async fn ensure_fresh_token(&mut self) -> Result<()> {
        let auth = self.auth.as_mut().ok_or(DriveError::NotAuthenticated)?;
        if auth.token.is_expired() {
            debug!("Access token expired, refreshing");
            auth.token = self.refresher.refresh(&auth.credentials).await?;
        }
        Ok(())
    }

    fn bearer(&self) -> Result<&str> {
        self.auth
            .as_ref()
            .map(|auth| auth.token.secret().expose_secret())
            .ok_or(DriveError::NotAuthenticated)
    }
}

#[async_trait(?Send)]
impl StorageSink for DriveStorage {
    async fn authenticate(&mut self, credentials: &DriveCredentials) -> Result<()> {
        if let Some(auth) = &self.auth {
            if !auth.token.is_expired() {
                debug!("Already authenticated with Google Drive");
                return Ok(());
            }
        }

        let token = self.refresher.refresh(credentials).await?;
        self.auth = Some(Authorization {
            credentials: credentials.clone(),
            token,
        });

        info!("Authenticated with Google Drive");
        Ok(())
    }

    async fn file_exists(&mut self, folder_id: &str, file_name: &str) -> Result<bool> {
        let query_failed = |reason: String| DriveError::QueryFailed {
            file_name: file_name.to_string(),
            reason,
        };

        let q = existence_query(folder_id, file_name);
        debug!("Drive query: {}", q);

        let mut page_token: Option<String> = None;
        loop {
            self.ensure_fresh_token().await?;

            let mut params = vec![
                ("q", q.clone()),
                ("spaces", "drive".to_string()),
                ("fields", "nextPageToken,files(id,name)".to_string()),
                ("pageSize", LIST_PAGE_SIZE.to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let response = self
                .http
                .get(format!("{}/files", self.endpoints.api_base))
                .bearer_auth(self.bearer()?)
                .query(&params)
                .send()
                .await
                .map_err(|e| query_failed(e.to_string()))?;

            let response = check_status(response).await.map_err(query_failed)?;
            let list: FileList = response
                .json()
                .await
                .map_err(|e| query_failed(format!("invalid response: {}", e)))?;

            if contains_exact(&list.files, file_name) {
                return Ok(true);
            }

            match list.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => {
                    debug!("'{}' not on this page, fetching the next one", file_name);
                    page_token = Some(token);
                }
                None => return Ok(false),
            }
        }
    }

    async fn upload(
        &mut self,
        folder_id: &str,
        file_name: &str,
        content: Vec<u8>,
        mime_type: &str,
    ) -> Result<RemoteFile> {
        self.ensure_fresh_token().await?;

        let upload_failed = |reason: String| DriveError::UploadFailed {
            file_name: file_name.to_string(),
            reason,
        };

        let metadata = serde_json::to_vec(&FileMetadata {
            name: file_name,
            parents: [folder_id],
        })
        .map_err(|e| upload_failed(e.to_string()))?;

        let boundary = format!("mail2drive-{}", Uuid::new_v4().simple());
        let size = content.len();
        let body = multipart_related_body(&boundary, &metadata, mime_type, &content);

        debug!("Uploading '{}' ({}, {} bytes)", file_name, mime_type, size);

        let response = self
            .http
            .post(format!("{}/files", self.endpoints.upload_base))
            .bearer_auth(self.bearer()?)
            .query(&[("uploadType", "multipart"), ("fields", "id,name")])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| upload_failed(e.to_string()))?;

        let response = check_status(response).await.map_err(upload_failed)?;
        response
            .json::<RemoteFile>()
            .await
            .map_err(|e| upload_failed(format!("invalid response: {}", e)))
    }
}

/// Returns the response on 2xx, else a short description of the failure.
async fn check_status(response: Response) -> std::result::Result<Response, String> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(format!("HTTP {}: {}", status, truncate_body(&body)))
}

/// Builds the Drive `q` expression for an exact name inside a folder.
fn existence_query(folder_id: &str, file_name: &str) -> String {
    format!(
        "name = '{}' and '{}' in parents and trashed = false",
        escape_query_value(file_name),
        escape_query_value(folder_id)
    )
}

/// Escapes `\` and `'` for use inside a single-quoted Drive query string.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Byte-exact name comparison on the listing; the server-side match is only
/// used to narrow the candidates.
fn contains_exact(files: &[RemoteFile], file_name: &str) -> bool {
    files.iter().any(|file| file.name == file_name)
}

/// Assembles a `multipart/related` body: JSON metadata, then the media part.
fn multipart_related_body(
    boundary: &str,
    metadata_json: &[u8],
    mime_type: &str,
    content: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + metadata_json.len() + 256);

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    body
}
