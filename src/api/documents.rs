// Documents service

use bytes::Bytes;
use std::path::Path;

use crate::error::Result;
use crate::http_client::SessionClient;
use crate::models::{
    CreateDocumentRequest, Document, DocumentSearch, DocumentVersion, ExpiringDocument,
    RevertResult, UploadedFile,
};
use crate::request::{ApiRequest, FilePart};

/// Document CRUD, versions, search and downloads
pub struct DocumentsService {
    client: SessionClient,
}

impl DocumentsService {
    pub(crate) fn new(client: SessionClient) -> Self {
        Self { client }
    }

    /// Create a document record (file content is uploaded separately)
    pub async fn create(&self, request: &CreateDocumentRequest) -> Result<Document> {
        self.client
            .json(ApiRequest::post("/documents").json(request)?)
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Document> {
        self.client
            .json(ApiRequest::get(format!("/documents/{}", id)))
            .await
    }

    /// Attach the file content of a document
    pub async fn upload_file(&self, id: &str, file: FilePart) -> Result<UploadedFile> {
        self.client
            .json(ApiRequest::post(format!("/documents/{}/file", id)).file(file))
            .await
    }

    pub async fn versions(&self, id: &str) -> Result<Vec<DocumentVersion>> {
        self.client
            .json_or_default(ApiRequest::get(format!("/documents/{}/versions", id)))
            .await
    }

    /// Upload a new version of a document
    pub async fn add_version(&self, id: &str, file: FilePart) -> Result<DocumentVersion> {
        self.client
            .json(ApiRequest::post(format!("/documents/{}/versions", id)).file(file))
            .await
    }

    /// Make an older version current again
    pub async fn revert_version(&self, id: &str, version_no: u32) -> Result<RevertResult> {
        self.client
            .json(ApiRequest::post(format!(
                "/documents/{}/versions/{}/revert",
                id, version_no
            )))
            .await
    }

    /// Current file content, fully buffered
    pub async fn download(&self, id: &str) -> Result<Bytes> {
        self.client
            .bytes(ApiRequest::get(format!("/files/{}/download", id)))
            .await
    }

    /// Stream the current file content to `path`, returning the byte count
    pub async fn download_to(&self, id: &str, path: &Path) -> Result<u64> {
        self.client
            .save_to(ApiRequest::get(format!("/files/{}/download", id)), path)
            .await
    }

    /// Full-text and tag search; unset filters are not sent
    pub async fn search(&self, search: &DocumentSearch) -> Result<Vec<Document>> {
        let request = ApiRequest::get("/documents/search")
            .query_opt("q", search.query.as_deref())
            .query_opt("tagKey", search.tag_key.as_deref())
            .query_opt("tagValue", search.tag_value.as_deref());

        self.client.json_or_default(request).await
    }

    pub async fn expiring_soon(&self) -> Result<Vec<ExpiringDocument>> {
        self.client
            .json_or_default(ApiRequest::get("/documents/expiring-soon"))
            .await
    }
}
