use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use gitpulse_core::models::{ActivityEvent, FetchMetadata, WorkItem};
use gitpulse_core::{Error, ResultSink};

/// SQLite implementation of the result sink
///
/// SQLite was chosen because:
/// - Zero-config embedded database
/// - Battle-tested and reliable
/// - Doesn't require a separate process
///
/// One row per collection key; a replaced collection overwrites the row,
/// which is what makes the store operations idempotent.
pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    pub fn new(db_path: &Path) -> gitpulse_core::Result<Self> {
        let conn = Connection::open(db_path).map_err(store_err)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, handy for tests
    pub fn in_memory() -> gitpulse_core::Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> gitpulse_core::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS collections (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                metadata TEXT NOT NULL,
                stored_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(store_err)?;
        Ok(())
    }

    fn conn(&self) -> gitpulse_core::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Store("sink mutex poisoned".into()))
    }

    fn put(&self, key: &str, payload: String, metadata: &FetchMetadata) -> gitpulse_core::Result<()> {
        let metadata_json = serde_json::to_string(metadata)?;
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO collections (key, payload, metadata, stored_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![key, payload, metadata_json, Utc::now().timestamp()],
            )
            .map_err(store_err)?;
        debug!("Stored collection under key '{}'", key);
        Ok(())
    }

    fn get(&self, key: &str) -> gitpulse_core::Result<Option<(String, String)>> {
        self.conn()?
            .query_row(
                "SELECT payload, metadata FROM collections WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(store_err)
    }

    /// Load a stored event collection, if any
    pub fn load_events(
        &self,
        key: &str,
    ) -> gitpulse_core::Result<Option<(Vec<ActivityEvent>, FetchMetadata)>> {
        match self.get(key)? {
            Some((payload, metadata)) => Ok(Some((
                serde_json::from_str(&payload)?,
                serde_json::from_str(&metadata)?,
            ))),
            None => Ok(None),
        }
    }

    /// Load a stored work-item collection, if any
    pub fn load_work_items(
        &self,
        key: &str,
    ) -> gitpulse_core::Result<Option<(Vec<WorkItem>, FetchMetadata)>> {
        match self.get(key)? {
            Some((payload, metadata)) => Ok(Some((
                serde_json::from_str(&payload)?,
                serde_json::from_str(&metadata)?,
            ))),
            None => Ok(None),
        }
    }
}

fn store_err(e: rusqlite::Error) -> Error {
    Error::Store(e.to_string())
}

#[async_trait]
impl ResultSink for SqliteSink {
    async fn store_events(
        &self,
        key: &str,
        events: &[ActivityEvent],
        metadata: &FetchMetadata,
    ) -> gitpulse_core::Result<()> {
        self.put(key, serde_json::to_string(events)?, metadata)
    }

    async fn store_work_items(
        &self,
        key: &str,
        items: &[WorkItem],
        metadata: &FetchMetadata,
    ) -> gitpulse_core::Result<()> {
        self.put(key, serde_json::to_string(items)?, metadata)
    }

    async fn clear(&self, key: &str) -> gitpulse_core::Result<()> {
        self.conn()?
            .execute("DELETE FROM collections WHERE key = ?1", params![key])
            .map_err(store_err)?;
        Ok(())
    }

    async fn contains(&self, key: &str) -> gitpulse_core::Result<bool> {
        let count: i64 = self
            .conn()?
            .query_row(
                "SELECT COUNT(*) FROM collections WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .map_err(store_err)?;
        Ok(count > 0)
    }
}
