//! Durable last-active-session pointer
//!
//! One key per user, `lastActiveSession_{userId}`, holding the id of the
//! session that was active when the client last ran. The pointer is read
//! once at startup and overwritten on every active-session change.

use crate::error::{MedchatError, Result};
use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key under which the pointer for `user_id` is stored
///
/// # Examples
///
/// ```
/// use medchat::session::pointer_key;
///
/// assert_eq!(pointer_key("7"), "lastActiveSession_7");
/// ```
pub fn pointer_key(user_id: &str) -> String {
    format!("lastActiveSession_{}", user_id)
}

/// Client-side key-value space holding session pointers
pub trait PointerStore: Send + Sync {
    /// Read the session id stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value under `key`
    fn set(&self, key: &str, session_id: &str) -> Result<()>;

    /// Remove `key` if present
    fn remove(&self, key: &str) -> Result<()>;
}

/// Pointer store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryPointerStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryPointerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| MedchatError::Storage("pointer map lock poisoned".to_string()).into())
    }
}

impl PointerStore for MemoryPointerStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, session_id: &str) -> Result<()> {
        self.entries()?
            .insert(key.to_string(), session_id.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Pointer store backed by a SQLite file
pub struct SqlitePointerStore {
    db_path: PathBuf,
}

impl SqlitePointerStore {
    /// Open the store in the user's data directory
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("org", "medchat", "medchat")
            .ok_or_else(|| MedchatError::Storage("Could not determine data directory".into()))?;

        Self::new_with_path(proj_dirs.data_dir().join("pointers.db"))
    }

    /// Open the store at an explicit path, creating parent directories
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(MedchatError::from)?;
        }

        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    /// Path of the backing database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path).map_err(MedchatError::from)?;
        Ok(conn)
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS session_pointers (
                key TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(MedchatError::from)?;
        Ok(())
    }
}

impl PointerStore for SqlitePointerStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.open()?;
        let value = conn
            .query_row(
                "SELECT session_id FROM session_pointers WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(MedchatError::from)?;
        Ok(value)
    }

    fn set(&self, key: &str, session_id: &str) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO session_pointers (key, session_id, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                session_id = excluded.session_id,
                updated_at = excluded.updated_at",
            params![key, session_id, Utc::now().to_rfc3339()],
        )
        .map_err(MedchatError::from)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.open()?;
        conn.execute("DELETE FROM session_pointers WHERE key = ?", params![key])
            .map_err(MedchatError::from)?;
        Ok(())
    }
}
