// Folder tree cache

use dashmap::DashMap;
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::http_client::SessionClient;
use crate::models::Folder;

/// Default time a listing stays fresh
pub const DEFAULT_FOLDER_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct CachedChildren {
    folders: Vec<Folder>,
    fetched_at: Instant,
}

/// Lazily populated folder tree
///
/// Children are cached per parent id; `None` is the root level.
#[derive(Clone)]
pub struct FolderCache {
    client: SessionClient,

    /// Child listings indexed by parent id
    children: Arc<DashMap<Option<String>, CachedChildren>>,

    /// Cache TTL
    ttl: Duration,
}

impl FolderCache {
    /// Create a new folder cache
    pub fn new(client: SessionClient, ttl: Duration) -> Self {
        Self {
            client,
            children: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Children of `parent_id`, fetched when missing or stale
    pub async fn children(&self, parent_id: Option<&str>) -> Result<Vec<Folder>> {
        let key = parent_id.map(str::to_string);

        if let Some(entry) = self.children.get(&key) {
            if entry.fetched_at.elapsed() < self.ttl {
                tracing::debug!(parent_id = ?parent_id, "Folder cache hit");
                return Ok(entry.folders.clone());
            }
        }

        let folders = self.client.folders().list(parent_id).await?;
        tracing::debug!(
            parent_id = ?parent_id,
            count = folders.len(),
            "Folder cache filled"
        );

        self.children.insert(
            key,
            CachedChildren {
                folders: folders.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(folders)
    }

    /// Load several parents concurrently; fails if any listing fails
    pub async fn expand_many(&self, parent_ids: &[String]) -> Result<Vec<(String, Vec<Folder>)>> {
        let loads = parent_ids.iter().map(|id| async move {
            let folders = self.children(Some(id)).await?;
            Ok::<_, crate::error::ApiError>((id.clone(), folders))
        });

        try_join_all(loads).await
    }

    /// Drop the cached listing for one parent
    pub fn invalidate(&self, parent_id: Option<&str>) {
        self.children.remove(&parent_id.map(str::to_string));
    }

    /// Drop all cached listings
    pub fn clear(&self) {
        self.children.clear();
    }

    pub fn is_cached(&self, parent_id: Option<&str>) -> bool {
        self.children.contains_key(&parent_id.map(str::to_string))
    }
}
