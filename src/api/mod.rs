// Resource services for the SafeDocs REST API
//
// Each service is obtained from a `SessionClient` and sends every call
// through its session handling

mod documents;
mod files;
mod folders;
mod shares;

pub use documents::DocumentsService;
pub use files::{FilesService, ThumbnailSize, DEFAULT_THUMBNAIL_HEIGHT, DEFAULT_THUMBNAIL_WIDTH};
pub use folders::FoldersService;
pub use shares::SharesService;
