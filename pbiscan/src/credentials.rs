//! Tenant credential loading from the process environment.
//!
//! The three variables are read exactly once at startup into an immutable
//! [`TenantCredentials`] value; every later stage receives configuration by
//! parameter and never consults the environment again.

use log::{debug, info};
use powerbi_admin::PowerBiConfig;

/// Environment variable holding the Azure AD tenant name or GUID.
pub const ENV_TENANT_NAME: &str = "PBI_TENANT_NAME";
/// Environment variable holding the service principal's client id.
pub const ENV_CLIENT_ID: &str = "PBI_ADMIN_API_CLIENT_ID";
/// Environment variable holding the service principal's client secret.
pub const ENV_CLIENT_SECRET: &str = "PBI_ADMIN_API_SECRET";

/// Custom error types for credential operations
#[derive(thiserror::Error, Debug)]
pub enum CredentialError {
    #[error("Missing required environment variables: {missing}")]
    MissingCredentials { missing: String },

    #[error("Environment variable validation failed: {field}: {message}")]
    ValidationError { field: String, message: String },
}

/// Secure wrapper for the client secret that redacts the value in debug output
#[derive(Clone)]
pub struct SecureSecret(String);

impl SecureSecret {
    #[must_use]
    pub fn new(secret: String) -> Self {
        SecureSecret(secret)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for SecureSecret {
    fn from(secret: String) -> Self {
        SecureSecret(secret)
    }
}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Process-wide tenant credentials, immutable for the run's lifetime.
#[derive(Debug, Clone)]
pub struct TenantCredentials {
    pub tenant: String,
    pub client_id: String,
    pub client_secret: SecureSecret,
}

impl TenantCredentials {
    /// Convert into the client configuration.
    #[must_use]
    pub fn to_config(&self) -> PowerBiConfig {
        PowerBiConfig::new(
            self.tenant.clone(),
            self.client_id.clone(),
            self.client_secret.as_str().to_string(),
        )
    }
}

/// Load tenant credentials from the process environment.
///
/// # Errors
///
/// Returns `CredentialError::MissingCredentials` listing every variable
/// that is absent, or `ValidationError` when one is present but empty.
pub fn load_tenant_credentials() -> Result<TenantCredentials, CredentialError> {
    debug!("Loading credentials from environment variables");

    let tenant = std::env::var(ENV_TENANT_NAME).ok();
    let client_id = std::env::var(ENV_CLIENT_ID).ok();
    let client_secret = std::env::var(ENV_CLIENT_SECRET).ok();

    let (Some(tenant), Some(client_id), Some(client_secret)) =
        (tenant.clone(), client_id.clone(), client_secret.clone())
    else {
        let missing: Vec<&str> = [
            (ENV_TENANT_NAME, &tenant),
            (ENV_CLIENT_ID, &client_id),
            (ENV_CLIENT_SECRET, &client_secret),
        ]
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| *name)
        .collect();

        return Err(CredentialError::MissingCredentials {
            missing: missing.join(", "),
        });
    };

    for (name, value) in [
        (ENV_TENANT_NAME, &tenant),
        (ENV_CLIENT_ID, &client_id),
        (ENV_CLIENT_SECRET, &client_secret),
    ] {
        if value.trim().is_empty() {
            return Err(CredentialError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".to_string(),
            });
        }
    }

    info!("Loaded credentials for tenant {tenant} from environment variables");
    Ok(TenantCredentials {
        tenant,
        client_id,
        client_secret: SecureSecret::new(client_secret),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_secret_debug_redaction() {
        let secret = SecureSecret::new("super_secret_value".to_string());
        let debug_output = format!("{secret:?}");

        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("super_secret_value"));
    }

    #[test]
    fn test_tenant_credentials_debug_redacts_secret() {
        let credentials = TenantCredentials {
            tenant: "contoso".to_string(),
            client_id: "client-1".to_string(),
            client_secret: SecureSecret::new("super_secret_value".to_string()),
        };
        let debug_output = format!("{credentials:?}");

        assert!(debug_output.contains("contoso"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_value"));
    }

    #[test]
    fn test_secure_secret_access_methods() {
        let secret = SecureSecret::new("value".to_string());

        assert_eq!(secret.as_str(), "value");
        assert_eq!(secret.into_string(), "value");
    }

    #[test]
    fn test_to_config() {
        let credentials = TenantCredentials {
            tenant: "contoso".to_string(),
            client_id: "client-1".to_string(),
            client_secret: SecureSecret::new("secret".to_string()),
        };

        let config = credentials.to_config();
        assert_eq!(config.tenant, "contoso");
        assert_eq!(config.client_id, "client-1");
        assert_eq!(config.client_secret, "secret");
        assert!(config.validate().is_ok());
    }
}
