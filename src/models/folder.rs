use serde::{Deserialize, Serialize};

// ==================================================================================================
// Folder Models
// ==================================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Caller's rights on a folder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderAccess {
    #[serde(default)]
    pub can_read: bool,
    #[serde(default)]
    pub can_write: bool,
    #[serde(default)]
    pub is_owner: bool,
}

// ==================================================================================================
// Sharing Models
// ==================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    Read,
    Write,
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "READ" => Ok(Permission::Read),
            "WRITE" => Ok(Permission::Write),
            other => Err(format!("unknown permission: {} (expected READ or WRITE)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareItem {
    pub id: String,
    /// Absent on some backends; revoking by user id needs it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_with_user_id: Option<String>,
    pub shared_with_email: String,
    pub permission: Permission,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareRequest {
    pub target_email: String,
    pub permission: Permission,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_item() {
        let share: ShareItem = serde_json::from_str(
            r#"{"id":"s1","sharedWithUserId":"u2","sharedWithEmail":"ion@example.com","permission":"WRITE"}"#,
        )
        .unwrap();
        assert_eq!(share.permission, Permission::Write);
        assert_eq!(share.shared_with_user_id.as_deref(), Some("u2"));
    }

    #[test]
    fn test_create_share_request() {
        let body = serde_json::to_value(CreateShareRequest {
            target_email: "ion@example.com".to_string(),
            permission: Permission::Read,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "targetEmail": "ion@example.com", "permission": "READ" })
        );
    }

    #[test]
    fn test_permission_from_str() {
        assert_eq!("read".parse::<Permission>(), Ok(Permission::Read));
        assert_eq!("WRITE".parse::<Permission>(), Ok(Permission::Write));
        assert!("admin".parse::<Permission>().is_err());
    }

    #[test]
    fn test_folder_access_defaults() {
        let access: FolderAccess = serde_json::from_str(r#"{"canWrite":true}"#).unwrap();
        assert!(access.can_write);
        assert!(!access.is_owner);
    }
}
