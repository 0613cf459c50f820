// Data models for the SafeDocs REST API

pub mod document;
pub mod folder;

pub use document::{
    CreateDocumentRequest, Document, DocumentListItem, DocumentSearch, DocumentVersion,
    ExpiringDocument, RevertResult, UploadedFile,
};
pub use folder::{
    CreateFolderRequest, CreateShareRequest, Folder, FolderAccess, Permission, ShareItem,
};
