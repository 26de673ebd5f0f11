//! OAuth2 refresh-token exchange for the Drive API.
//!
//! No interactive consent happens at run time: a long-lived refresh token is
//! exchanged for a short-lived access token whenever the current one is
//! absent or about to expire.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::DriveCredentials;
use crate::sanitize::truncate_body;

use super::error::{DriveError, Result};

/// Google's OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    /// Lifetime in seconds of the access token.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Error body returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
struct TokenErrorResponse {
    error: String,

    #[serde(default)]
    error_description: Option<String>,
}

/// A bearer token and when it stops being valid.
#[derive(Debug)]
pub struct AccessToken {
    secret: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            expires_at,
        }
    }

    pub fn from_response(response: TokenResponse) -> Self {
        let expires_at = response
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| Utc::now() + Duration::seconds(secs));

        Self::new(response.access_token, expires_at)
    }

    /// Checks if the token is expired (with a 60 second buffer). Tokens
    /// without a known expiry never expire locally.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now() + Duration::seconds(EXPIRY_BUFFER_SECS) >= exp)
    }

    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

/// Exchanges refresh tokens at a token endpoint.
pub struct TokenRefresher {
    client: Client,
    token_url: String,
}

impl TokenRefresher {
    pub fn new(client: Client, token_url: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
        }
    }

    /// Obtains a fresh access token with the `refresh_token` grant.
    pub async fn refresh(&self, credentials: &DriveCredentials) -> Result<AccessToken> {
        debug!("Refreshing access token at {}", self.token_url);

        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose_secret()),
            ("refresh_token", credentials.refresh_token.expose_secret()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| DriveError::AuthenticationFailed(format!("Token refresh failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::AuthenticationFailed(describe_refresh_error(
                status, &body,
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            DriveError::AuthenticationFailed(format!("Failed to parse refresh response: {}", e))
        })?;

        info!("Successfully refreshed Google Drive access token");
        Ok(AccessToken::from_response(token))
    }
}

fn describe_refresh_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(err) if err.error == "invalid_grant" => {
            "refresh token was revoked or has expired (invalid_grant)".to_string()
        }
        Ok(err) => format!(
            "Token refresh failed ({}): {} {}",
            status,
            err.error,
            err.error_description.unwrap_or_default()
        )
        .trim_end()
        .to_string(),
        Err(_) => format!("Token refresh failed ({}): {}", status, truncate_body(body)),
    }
}
