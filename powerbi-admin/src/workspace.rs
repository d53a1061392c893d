//! Workspace enumeration through the admin API.

use log::info;
use serde::{Deserialize, Serialize};

use crate::{PowerBiClient, PowerBiError};

/// Summary entry from the "modified workspaces" admin endpoint.
///
/// The live endpoint has served both `id` and `Id` spellings over time, so
/// both are accepted. Fields beyond id/name are kept verbatim in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifiedWorkspace {
    #[serde(alias = "Id")]
    pub id: String,
    #[serde(default, alias = "Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Workspace API operations.
pub struct WorkspaceApi<'a> {
    client: &'a PowerBiClient,
}

impl<'a> WorkspaceApi<'a> {
    /// Create a new workspace API instance.
    #[must_use]
    pub fn new(client: &'a PowerBiClient) -> Self {
        Self { client }
    }

    /// List all workspaces modified within the platform's lookback window.
    ///
    /// Issues one authenticated GET; there is no pagination on this
    /// endpoint and no retry on failure.
    ///
    /// # Arguments
    ///
    /// * `exclude_personal` - Drop personal ("My workspace") workspaces
    ///
    /// # Errors
    ///
    /// Returns `PowerBiError::Api` on any non-success HTTP status.
    pub async fn list_modified(
        &self,
        exclude_personal: bool,
    ) -> Result<Vec<ModifiedWorkspace>, PowerBiError> {
        // The admin endpoints document capitalized boolean literals
        let flag = if exclude_personal { "True" } else { "False" };
        let url = self.client.admin_url(&format!(
            "admin/workspaces/modified?excludePersonalWorkspaces={flag}"
        ));

        let response = self.client.get(&url).await?;
        let workspaces: Vec<ModifiedWorkspace> = response.json().await?;

        info!("Listed {} modified workspaces", workspaces.len());
        Ok(workspaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_parsing_lowercase_id() {
        let body = r#"[{"id":"a1b2","name":"Finance"},{"id":"c3d4"}]"#;
        let workspaces: Vec<ModifiedWorkspace> = serde_json::from_str(body).unwrap();

        assert_eq!(workspaces.len(), 2);
        assert_eq!(workspaces[0].id, "a1b2");
        assert_eq!(workspaces[0].name.as_deref(), Some("Finance"));
        assert!(workspaces[1].name.is_none());
    }

    #[test]
    fn test_workspace_parsing_capitalized_id() {
        let body = r#"[{"Id":"a1b2","Name":"Finance"}]"#;
        let workspaces: Vec<ModifiedWorkspace> = serde_json::from_str(body).unwrap();

        assert_eq!(workspaces[0].id, "a1b2");
        assert_eq!(workspaces[0].name.as_deref(), Some("Finance"));
    }

    #[test]
    fn test_workspace_keeps_unknown_fields() {
        let body = r#"[{"id":"a1b2","capacityId":"cap-1"}]"#;
        let workspaces: Vec<ModifiedWorkspace> = serde_json::from_str(body).unwrap();

        assert_eq!(
            workspaces[0].extra.get("capacityId").and_then(|v| v.as_str()),
            Some("cap-1")
        );
    }
}
