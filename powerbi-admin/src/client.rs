//! Core Power BI admin API client implementation.
//!
//! This module contains the foundational client for making authenticated
//! requests to the admin API: bearer-token injection with silent cache
//! reuse, HTTP status checking, and accessors for the endpoint-specific
//! API modules.

use log::debug;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth::{self, CachedToken, TOKEN_REFRESH_LEEWAY};
use crate::scan::ScanApi;
use crate::workspace::WorkspaceApi;
use crate::{PowerBiConfig, PowerBiError};

/// Core Power BI admin API client.
///
/// Holds the HTTP client and a process-wide token cache; clones share the
/// cache, so one run performs at most one token exchange until expiry.
#[derive(Clone)]
pub struct PowerBiClient {
    config: PowerBiConfig,
    http: Client,
    token_cache: Arc<Mutex<Option<CachedToken>>>,
}

impl PowerBiClient {
    /// Create a new admin API client.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration containing credentials and endpoints
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete or the
    /// underlying HTTP client cannot be constructed.
    pub fn new(config: PowerBiConfig) -> Result<Self, PowerBiError> {
        config.validate()?;

        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            config,
            http,
            token_cache: Arc::new(Mutex::new(None)),
        })
    }

    /// Get access to the configuration.
    #[must_use]
    pub fn config(&self) -> &PowerBiConfig {
        &self.config
    }

    /// Get a workspace API instance.
    #[must_use]
    pub fn workspace_api(&self) -> WorkspaceApi<'_> {
        WorkspaceApi::new(self)
    }

    /// Get a scan API instance.
    #[must_use]
    pub fn scan_api(&self) -> ScanApi<'_> {
        ScanApi::new(self)
    }

    /// Return a valid bearer token, reusing the cached one when possible.
    ///
    /// # Errors
    ///
    /// Returns `PowerBiError::Auth` when a fresh token exchange fails.
    pub async fn bearer_token(&self) -> Result<String, PowerBiError> {
        let mut cache = self.token_cache.lock().await;

        if let Some(token) = cache.as_ref()
            && !token.is_expired(TOKEN_REFRESH_LEEWAY)
        {
            debug!("Reusing cached access token");
            return Ok(token.bearer().to_string());
        }

        let token = auth::acquire_token(&self.http, &self.config).await?;
        let bearer = token.bearer().to_string();
        *cache = Some(token);
        Ok(bearer)
    }

    /// Authenticated GET against an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns `PowerBiError::Api` on any non-success HTTP status.
    pub(crate) async fn get(&self, url: &str) -> Result<reqwest::Response, PowerBiError> {
        let bearer = self.bearer_token().await?;
        debug!("GET {url}");

        let response = self
            .http
            .get(url)
            .bearer_auth(bearer)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Authenticated POST of a JSON body against an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns `PowerBiError::Api` on any non-success HTTP status.
    pub(crate) async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response, PowerBiError> {
        let bearer = self.bearer_token().await?;
        debug!("POST {url}");

        let response = self
            .http
            .post(url)
            .bearer_auth(bearer)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Build a full admin API URL from a relative path.
    #[must_use]
    pub(crate) fn admin_url(&self, path: &str) -> String {
        self.config.api_url(path)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PowerBiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(PowerBiError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PowerBiConfig {
        PowerBiConfig::new(
            "contoso.onmicrosoft.com".to_string(),
            "test_client_id".to_string(),
            "test_client_secret".to_string(),
        )
    }

    #[test]
    fn test_client_creation() {
        let client = PowerBiClient::new(test_config());
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_creation_rejects_empty_credentials() {
        let mut config = test_config();
        config.client_id = String::new();

        let result = PowerBiClient::new(config);
        assert!(matches!(result, Err(PowerBiError::InvalidConfig(_))));
    }

    #[test]
    fn test_clones_share_token_cache() {
        let client = PowerBiClient::new(test_config()).unwrap();
        let clone = client.clone();

        assert!(Arc::ptr_eq(&client.token_cache, &clone.token_cache));
    }

    #[test]
    fn test_admin_url() {
        let client = PowerBiClient::new(test_config()).unwrap();

        assert_eq!(
            client.admin_url("admin/workspaces/modified"),
            "https://api.powerbi.com/v1.0/myorg/admin/workspaces/modified"
        );
    }
}
