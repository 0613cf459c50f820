// Folder sharing service

use crate::error::Result;
use crate::http_client::SessionClient;
use crate::models::{CreateShareRequest, ShareItem};
use crate::request::ApiRequest;

/// Folder shares; only the folder owner may call these
pub struct SharesService {
    client: SessionClient,
}

impl SharesService {
    pub(crate) fn new(client: SessionClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, folder_id: &str) -> Result<Vec<ShareItem>> {
        self.client
            .json_or_default(ApiRequest::get(format!("/folders/{}/shares", folder_id)))
            .await
    }

    pub async fn create(&self, folder_id: &str, request: &CreateShareRequest) -> Result<ShareItem> {
        self.client
            .json(ApiRequest::post(format!("/folders/{}/shares", folder_id)).json(request)?)
            .await
    }

    /// Revoke by the target user's id (not the share id)
    pub async fn revoke(&self, folder_id: &str, target_user_id: &str) -> Result<()> {
        self.client
            .send_empty(ApiRequest::delete(format!(
                "/folders/{}/shares/{}",
                folder_id, target_user_id
            )))
            .await
    }

    /// Revoke by email, for backends that expose the by-email route
    pub async fn revoke_by_email(&self, folder_id: &str, email: &str) -> Result<()> {
        let request = ApiRequest::delete(format!("/folders/{}/shares/by-email", folder_id))
            .query("email", email);
        self.client.send_empty(request).await
    }
}
