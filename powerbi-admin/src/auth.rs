//! Azure AD client-credentials token acquisition.
//!
//! Implements the single token exchange the admin API needs: POST the
//! tenant's v2.0 token endpoint with the client id/secret and the fixed
//! Power BI scope. Token caching lives in [`crate::client::PowerBiClient`];
//! this module only knows how to fetch and represent one token.

use log::debug;
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::{PowerBiConfig, PowerBiError};

/// Refresh the cached token this long before its reported expiry.
pub(crate) const TOKEN_REFRESH_LEEWAY: Duration = Duration::from_secs(60);

/// Successful response from the Azure AD token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Token lifetime in seconds
    pub expires_in: u64,
}

/// Error payload from the Azure AD token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// A bearer token together with its acquisition time and lifetime.
///
/// Owned by the client's token cache; reused silently across calls within
/// one run until it nears expiry.
#[derive(Debug, Clone)]
pub struct CachedToken {
    bearer: String,
    acquired_at: Instant,
    lifetime: Duration,
}

impl CachedToken {
    pub(crate) fn new(bearer: String, expires_in_seconds: u64) -> Self {
        Self {
            bearer,
            acquired_at: Instant::now(),
            lifetime: Duration::from_secs(expires_in_seconds),
        }
    }

    /// The opaque bearer string.
    #[must_use]
    pub fn bearer(&self) -> &str {
        &self.bearer
    }

    /// Whether the token is expired or will expire within `leeway`.
    #[must_use]
    pub fn is_expired(&self, leeway: Duration) -> bool {
        self.acquired_at.elapsed() + leeway >= self.lifetime
    }
}

/// Perform a client-credentials exchange against the tenant's token endpoint.
///
/// A single failure aborts the caller; there is no retry at this layer.
///
/// # Errors
///
/// Returns `PowerBiError::Auth` when the transport fails, the endpoint
/// returns an error payload, or the response carries no usable token.
pub(crate) async fn acquire_token(
    http: &reqwest::Client,
    config: &PowerBiConfig,
) -> Result<CachedToken, PowerBiError> {
    let token_url = config.token_endpoint();
    debug!("Requesting access token from {token_url}");

    let params = [
        ("grant_type", "client_credentials"),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("scope", config.scope.as_str()),
    ];

    let response = http
        .post(&token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| PowerBiError::Auth(format!("token request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| PowerBiError::Auth(format!("failed to read token response: {e}")))?;

    if !status.is_success() {
        // Prefer the structured AAD error description when one is present
        if let Ok(err) = serde_json::from_str::<TokenErrorResponse>(&body) {
            return Err(PowerBiError::Auth(format!(
                "{}: {}",
                err.error,
                err.error_description.unwrap_or_default()
            )));
        }
        return Err(PowerBiError::Auth(format!(
            "token endpoint returned HTTP {status}"
        )));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| PowerBiError::Auth(format!("failed to parse token response: {e}")))?;

    if token.access_token.is_empty() {
        return Err(PowerBiError::Auth(
            "token endpoint returned no usable token".to_string(),
        ));
    }

    debug!(
        "Acquired access token (expires in {} seconds)",
        token.expires_in
    );
    Ok(CachedToken::new(token.access_token, token.expires_in))
}
