use parking_lot::Mutex;
use pathpdf_core::{
    NodeId, RemoteStatus, RoadmapData, RoadmapId, RoadmapSummary, SessionKey, SessionSnapshot,
    StatusPatch, TreeError,
};
use rusqlite::{Connection, TransactionBehavior, params};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod roadmaps;
mod schema;
mod session;
mod status;

const SCHEMA_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Stored roadmap is unusable: {0}")]
    Tree(#[from] TreeError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Other error: {0}")]
    Other(String),
}

// ============================================================================
// Persistence Boundary
// ============================================================================

/// Where roadmap trees come from.
pub trait RoadmapSource {
    fn load_roadmap(&self, id: &RoadmapId) -> Result<RoadmapData, StorageError>;
}

/// Local, per-roadmap cache: expansion, dragged positions and in-progress
/// flags. Keyed by [`SessionKey`].
pub trait SessionCache {
    fn load_session_state(&self, key: &SessionKey) -> Result<SessionSnapshot, StorageError>;
    fn save_session_state(
        &self,
        key: &SessionKey,
        state: &SessionSnapshot,
    ) -> Result<(), StorageError>;
    fn load_in_progress(&self, key: &SessionKey) -> Result<HashSet<NodeId>, StorageError>;
    fn set_in_progress(
        &self,
        key: &SessionKey,
        node: &NodeId,
        in_progress: bool,
    ) -> Result<(), StorageError>;
}

/// Remote completion and favorites, keyed by roadmap.
///
/// Favorites are one id array per roadmap. Implementations must re-read the
/// array inside the write so concurrent toggles merge instead of replaying a
/// stale snapshot; the last write still wins for the same node.
pub trait StatusStore {
    fn load_node_status(&self, roadmap: &RoadmapId) -> Result<RemoteStatus, StorageError>;
    fn mutate_node_status(
        &self,
        roadmap: &RoadmapId,
        node: &NodeId,
        patch: StatusPatch,
    ) -> Result<(), StorageError>;
}

/// SQLite-backed implementation of every persistence trait.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        // Two sessions on the same file write concurrently; wait instead of failing.
        let _ = conn.busy_timeout(Duration::from_millis(2_500));
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init()?;
        Ok(storage)
    }

    pub fn new_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init()?;
        Ok(storage)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM in_progress_node", [])?;
        tx.execute("DELETE FROM session_state", [])?;
        tx.execute("DELETE FROM roadmap_favorite", [])?;
        tx.execute("DELETE FROM node_progress", [])?;
        tx.execute("DELETE FROM roadmap", [])?;
        tx.commit()?;
        Ok(())
    }

    fn init(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        schema::create_tables(&conn)?;
        schema::create_indexes(&conn)?;
        schema::apply_schema_migrations(&conn)
    }

    fn schema_version(conn: &Connection) -> Result<u32, StorageError> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version.max(0) as u32)
    }

    fn set_schema_version(conn: &Connection, version: u32) -> Result<(), StorageError> {
        conn.pragma_update(None, "user_version", version.to_string())?;
        Ok(())
    }

    // ========================================================================
    // Roadmaps
    // ========================================================================

    /// Stores a generated or imported roadmap, replacing any previous content
    /// under the same id.
    pub fn save_roadmap(&self, id: &RoadmapId, roadmap: &RoadmapData) -> Result<(), StorageError> {
        roadmaps::save_roadmap(&self.conn.lock(), id, roadmap)
    }

    pub fn list_roadmaps(&self) -> Result<Vec<RoadmapSummary>, StorageError> {
        roadmaps::list_roadmaps(&self.conn.lock())
    }

    /// Deletes a roadmap with its completion rows and favorites.
    pub fn delete_roadmap(&self, id: &RoadmapId) -> Result<bool, StorageError> {
        roadmaps::delete_roadmap(&self.conn.lock(), id)
    }

    pub fn get_favorites(&self, roadmap: &RoadmapId) -> Result<Vec<NodeId>, StorageError> {
        status::get_favorites(&self.conn.lock(), roadmap)
    }
}

impl RoadmapSource for Storage {
    fn load_roadmap(&self, id: &RoadmapId) -> Result<RoadmapData, StorageError> {
        roadmaps::load_roadmap(&self.conn.lock(), id)
    }
}

impl SessionCache for Storage {
    fn load_session_state(&self, key: &SessionKey) -> Result<SessionSnapshot, StorageError> {
        session::load_session_state(&self.conn.lock(), key)
    }

    fn save_session_state(
        &self,
        key: &SessionKey,
        state: &SessionSnapshot,
    ) -> Result<(), StorageError> {
        session::save_session_state(&self.conn.lock(), key, state)
    }

    fn load_in_progress(&self, key: &SessionKey) -> Result<HashSet<NodeId>, StorageError> {
        session::load_in_progress(&self.conn.lock(), key)
    }

    fn set_in_progress(
        &self,
        key: &SessionKey,
        node: &NodeId,
        in_progress: bool,
    ) -> Result<(), StorageError> {
        session::set_in_progress(&self.conn.lock(), key, node, in_progress)
    }
}

impl StatusStore for Storage {
    fn load_node_status(&self, roadmap: &RoadmapId) -> Result<RemoteStatus, StorageError> {
        status::load_node_status(&self.conn.lock(), roadmap)
    }

    fn mutate_node_status(
        &self,
        roadmap: &RoadmapId,
        node: &NodeId,
        patch: StatusPatch,
    ) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        // Take the write lock before the favorites re-read so a concurrent
        // writer makes this wait on busy_timeout instead of failing the upgrade.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(completed) = patch.completed {
            status::set_completed(&tx, roadmap, node, completed)?;
        }
        if let Some(bookmarked) = patch.bookmarked {
            status::set_favorite(&tx, roadmap, node, bookmarked)?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
