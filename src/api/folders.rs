// Folders service

use crate::error::{ApiError, Result};
use crate::http_client::SessionClient;
use crate::models::{CreateFolderRequest, DocumentListItem, Folder, FolderAccess};
use crate::request::ApiRequest;

/// Folder listing, creation and access checks
///
/// Listing endpoints answer 204 when empty; those map to an empty `Vec`
pub struct FoldersService {
    client: SessionClient,
}

impl FoldersService {
    pub(crate) fn new(client: SessionClient) -> Self {
        Self { client }
    }

    /// List folders under `parent_id`, or the root folders when `None`
    pub async fn list(&self, parent_id: Option<&str>) -> Result<Vec<Folder>> {
        let request = ApiRequest::get("/folders").query_opt("parentId", parent_id);
        self.client.json_or_default(request).await
    }

    pub async fn create(&self, request: &CreateFolderRequest) -> Result<Folder> {
        self.client
            .json(ApiRequest::post("/folders").json(request)?)
            .await
    }

    /// Documents stored directly in a folder
    pub async fn documents(&self, folder_id: &str) -> Result<Vec<DocumentListItem>> {
        if folder_id.is_empty() {
            return Err(ApiError::InvalidRequest("folderId is required".to_string()));
        }

        let request = ApiRequest::get("/documents").query("folderId", folder_id);
        self.client.json_or_default(request).await
    }

    /// The caller's rights on a folder
    pub async fn access(&self, folder_id: &str) -> Result<FolderAccess> {
        self.client
            .json(ApiRequest::get(format!("/folders/{}/access", folder_id)))
            .await
    }

    /// Folders other users shared with the caller
    pub async fn shared_folders(&self) -> Result<Vec<Folder>> {
        self.client
            .json_or_default(ApiRequest::get("/shared/folders"))
            .await
    }

    /// Documents reachable through shared folders
    pub async fn shared_documents(&self) -> Result<Vec<DocumentListItem>> {
        self.client
            .json_or_default(ApiRequest::get("/shared/documents"))
            .await
    }
}
