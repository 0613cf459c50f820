// File preview and thumbnail service

use bytes::Bytes;
use std::path::Path;

use crate::error::Result;
use crate::http_client::SessionClient;
use crate::models::Document;
use crate::request::ApiRequest;

/// Default thumbnail box in pixels
pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 320;
pub const DEFAULT_THUMBNAIL_HEIGHT: u32 = 200;

/// Thumbnail dimensions requested from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_THUMBNAIL_WIDTH,
            height: DEFAULT_THUMBNAIL_HEIGHT,
        }
    }
}

/// Authenticated file previews
pub struct FilesService {
    client: SessionClient,
}

impl FilesService {
    pub(crate) fn new(client: SessionClient) -> Self {
        Self { client }
    }

    /// Inline rendition of a document, fetched with the session's bearer
    pub async fn view(&self, document_id: &str) -> Result<Bytes> {
        self.client
            .bytes(ApiRequest::get(format!("/files/{}/view", document_id)))
            .await
    }

    /// Stream the inline rendition to `path`, returning the byte count
    pub async fn view_to(&self, document_id: &str, path: &Path) -> Result<u64> {
        self.client
            .save_to(ApiRequest::get(format!("/files/{}/view", document_id)), path)
            .await
    }

    /// Absolute URL of the inline viewer (carries no credentials)
    pub fn view_url(&self, document_id: &str) -> String {
        self.client.url(&format!("/files/{}/view", document_id))
    }

    /// Absolute URL of a document thumbnail
    pub fn thumbnail_url(&self, document_id: &str, size: ThumbnailSize) -> String {
        self.client.url(&format!(
            "/files/{}/thumbnail?w={}&h={}",
            document_id, size.width, size.height
        ))
    }

    /// Thumbnail image bytes
    pub async fn thumbnail(&self, document_id: &str, size: ThumbnailSize) -> Result<Bytes> {
        let request = ApiRequest::get(format!("/files/{}/thumbnail", document_id))
            .query("w", size.width)
            .query("h", size.height);
        self.client.bytes(request).await
    }

    /// File metadata of a document
    pub async fn metadata(&self, document_id: &str) -> Result<Document> {
        self.client
            .json(ApiRequest::get(format!("/documents/{}", document_id)))
            .await
    }
}
