// Durable storage for the refresh token

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Key under which the current refresh token is persisted
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Persistence seam for the refresh token
///
/// Implementations hold at most one value; `clear` on an empty store is a no-op.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, refresh_token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// SQLite-backed store (key/value table, one row per key)
pub struct SqliteTokenStore {
    conn: Mutex<Connection>,
}

impl SqliteTokenStore {
    /// Open (or create) the state database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create state directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database: {}", path.display()))?;
        Self::with_connection(conn)
    }

    /// In-memory database, gone when the store is dropped
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS session_kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .context("Failed to create session_kv table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("SQLite connection mutex poisoned"))
    }
}

impl TokenStore for SqliteTokenStore {
    fn load(&self) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM session_kv WHERE key = ?",
            [REFRESH_TOKEN_KEY],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to load refresh token from SQLite")
    }

    fn save(&self, refresh_token: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO session_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [REFRESH_TOKEN_KEY, refresh_token],
        )
        .context("Failed to save refresh token to SQLite")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM session_kv WHERE key = ?", [REFRESH_TOKEN_KEY])
            .context("Failed to erase refresh token from SQLite")?;
        Ok(())
    }
}

/// Process-local store, used for ephemeral sessions and tests
#[derive(Default)]
pub struct MemoryTokenStore {
    value: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(refresh_token: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(refresh_token.into())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.value
            .lock()
            .map_err(|_| anyhow::anyhow!("token store mutex poisoned"))
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, refresh_token: &str) -> Result<()> {
        *self.lock()? = Some(refresh_token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_store_roundtrip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.sqlite3");

        {
            let store = SqliteTokenStore::open(&path).unwrap();
            assert_eq!(store.load().unwrap(), None);
            store.save("R1").unwrap();
            store.save("R2").unwrap();
        }

        let store = SqliteTokenStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap(), Some("R2".to_string()));
    }

    #[test]
    fn test_sqlite_store_clear_is_idempotent() {
        let store = SqliteTokenStore::open_in_memory().unwrap();
        store.save("R1").unwrap();

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::with_token("R1");
        assert_eq!(store.load().unwrap(), Some("R1".to_string()));

        store.save("R2").unwrap();
        assert_eq!(store.load().unwrap(), Some("R2".to_string()));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
