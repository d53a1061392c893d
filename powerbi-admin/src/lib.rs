//! # Power BI Admin API Client Library
//!
//! A Rust client library for the Power BI admin API, covering workspace
//! enumeration and asynchronous tenant metadata scans.
//!
//! This library handles Azure AD client-credentials authentication with
//! transparent token reuse, request/response serialization, and error
//! handling for the admin endpoints used by tenant metadata extraction:
//!
//! - **Workspace API** - list organizational workspaces modified within the
//!   platform's lookback window
//! - **Scan API** - trigger `workspaces/getInfo` scan jobs, poll their status
//!   and retrieve the full nested scan result
//!
//! ## Quick Start
//!
//! ```no_run
//! use powerbi_admin::{PowerBiConfig, PowerBiClient, ScanOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PowerBiConfig::new(
//!         "contoso.onmicrosoft.com".to_string(),
//!         "client-id".to_string(),
//!         "client-secret".to_string(),
//!     );
//!
//!     let client = PowerBiClient::new(config)?;
//!
//!     let workspaces = client.workspace_api().list_modified(true).await?;
//!     let ids: Vec<String> = workspaces.into_iter().map(|ws| ws.id).collect();
//!
//!     let outcome = client
//!         .scan_api()
//!         .scan_batch(&ids, &ScanOptions::default())
//!         .await?;
//!     println!("{outcome:?}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Sovereign clouds and testing
//!
//! Both the Azure AD authority and the admin API base URL can be redirected
//! with [`PowerBiConfig::with_authority_base`] and
//! [`PowerBiConfig::with_api_base_url`], which also allows pointing the
//! client at a local mock server in tests.

pub mod auth;
pub mod client;
pub mod scan;
pub mod workspace;

use std::time::Duration;
use url::Url;

// Re-export common types for convenience
pub use client::PowerBiClient;
pub use scan::{
    BatchOutcome, ScanApi, ScanJob, ScanOptions, ScanResult, ScanStatus, ScanStatusPoll,
    ScanStatusResponse, WorkspaceInfo,
};
pub use workspace::{ModifiedWorkspace, WorkspaceApi};

/// Default Azure AD authority base URL (public cloud).
pub const DEFAULT_AUTHORITY_BASE: &str = "https://login.microsoftonline.com";

/// Default Power BI admin API base URL (public cloud).
pub const DEFAULT_API_BASE_URL: &str = "https://api.powerbi.com/v1.0/myorg";

/// OAuth scope required by the Power BI admin API.
pub const DEFAULT_SCOPE: &str = "https://analysis.windows.net/powerbi/api/.default";

/// Custom error type for Power BI admin API operations.
#[derive(Debug, thiserror::Error)]
pub enum PowerBiError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Token acquisition failed (error payload, missing token or transport failure)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Admin API returned a non-success HTTP status
    #[error("API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// Response was structurally unusable (e.g. a scan trigger without a Location header)
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Configuration for the Power BI admin API client.
///
/// Contains the tenant credentials and the endpoints the client talks to.
/// Built once at startup and passed by parameter; the client never reads
/// configuration from the environment itself.
#[derive(Debug, Clone)]
pub struct PowerBiConfig {
    /// Azure AD tenant name or GUID
    pub tenant: String,
    /// Application (client) id of the service principal
    pub client_id: String,
    /// Client secret of the service principal
    pub client_secret: String,
    /// Azure AD authority base URL
    pub authority_base: String,
    /// Admin API base URL
    pub api_base_url: String,
    /// OAuth scope requested during the client-credentials exchange
    pub scope: String,
    /// Connection timeout for HTTP requests
    pub connect_timeout: Duration,
    /// Total timeout for each HTTP request
    pub request_timeout: Duration,
}

impl PowerBiConfig {
    /// Create a new configuration for the public cloud endpoints.
    ///
    /// # Arguments
    ///
    /// * `tenant` - Azure AD tenant name or GUID
    /// * `client_id` - Application id of the service principal
    /// * `client_secret` - Client secret of the service principal
    pub fn new(tenant: String, client_id: String, client_secret: String) -> Self {
        Self {
            tenant,
            client_id,
            client_secret,
            authority_base: DEFAULT_AUTHORITY_BASE.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Override the Azure AD authority base URL (sovereign clouds, tests).
    #[must_use]
    pub fn with_authority_base(mut self, authority_base: impl Into<String>) -> Self {
        self.authority_base = authority_base.into();
        self
    }

    /// Override the admin API base URL (sovereign clouds, tests).
    #[must_use]
    pub fn with_api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }

    /// Override the OAuth scope requested during token acquisition.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Override the HTTP timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    /// The tenant-specific Azure AD v2 token endpoint.
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_base.trim_end_matches('/'),
            self.tenant
        )
    }

    /// Build a full admin API URL from a relative path.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Validate that all required fields are present and the endpoint
    /// URLs parse.
    ///
    /// # Errors
    ///
    /// Returns `PowerBiError::InvalidConfig` naming the first empty field
    /// or unparseable URL.
    pub fn validate(&self) -> Result<(), PowerBiError> {
        for (name, value) in [
            ("tenant", &self.tenant),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(PowerBiError::InvalidConfig(format!(
                    "{name} must not be empty"
                )));
            }
        }

        for (name, value) in [
            ("authority_base", &self.authority_base),
            ("api_base_url", &self.api_base_url),
        ] {
            Url::parse(value)
                .map_err(|e| PowerBiError::InvalidConfig(format!("{name}: {e}")))?;
        }

        Ok(())
    }
}
