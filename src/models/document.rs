use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==================================================================================================
// Document Models
// ==================================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Row in a folder listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVersion {
    pub id: String,
    pub version_no: u32,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_sha256: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Entry of the expiring-soon listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringDocument {
    pub document_id: String,
    pub user_id: String,
    pub title: String,
    pub expires_at: DateTime<Utc>,
    pub days_left: i64,
}

// ==================================================================================================
// Request / Response Models
// ==================================================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, serde_json::Value>>,
}

/// Search filters; unset fields are not sent
#[derive(Debug, Clone, Default)]
pub struct DocumentSearch {
    pub query: Option<String>,
    pub tag_key: Option<String>,
    pub tag_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub path: String,
    pub mime: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertResult {
    pub current_path: String,
    pub version_set_to: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_with_sparse_fields() {
        let doc: Document = serde_json::from_str(
            r#"{"id":"d1","title":"Passport","folderId":null,"expiresAt":"2026-03-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(doc.id, "d1");
        assert!(doc.folder_id.is_none());
        assert_eq!(
            doc.expires_at.unwrap().to_rfc3339(),
            "2026-03-01T00:00:00+00:00"
        );
        assert!(doc.tags.is_none());
    }

    #[test]
    fn test_create_request_omits_unset_fields() {
        let body = serde_json::to_value(CreateDocumentRequest {
            title: "Lease".to_string(),
            folder_id: Some("f1".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(body, serde_json::json!({ "title": "Lease", "folderId": "f1" }));
    }

    #[test]
    fn test_expiring_document() {
        let item: ExpiringDocument = serde_json::from_str(
            r#"{"documentId":"d1","userId":"u1","title":"ID card","expiresAt":"2026-01-10T12:00:00Z","daysLeft":3}"#,
        )
        .unwrap();
        assert_eq!(item.days_left, 3);
    }

    #[test]
    fn test_revert_result() {
        let result: RevertResult =
            serde_json::from_str(r#"{"currentPath":"docs/d1/v2.pdf","versionSetTo":2}"#).unwrap();
        assert_eq!(result.version_set_to, 2);
    }
}
