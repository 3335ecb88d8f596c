use super::*;

const TABLE_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS roadmap (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS node_progress (
        roadmap_id TEXT NOT NULL,
        node_id TEXT NOT NULL,
        completed INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY(roadmap_id, node_id)
    )",
    "CREATE TABLE IF NOT EXISTS roadmap_favorite (
        roadmap_id TEXT PRIMARY KEY,
        node_ids TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS session_state (
        session_key TEXT PRIMARY KEY,
        expanded TEXT NOT NULL,
        overrides TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS in_progress_node (
        session_key TEXT NOT NULL,
        node_id TEXT NOT NULL,
        PRIMARY KEY(session_key, node_id)
    )",
];

const INDEX_STATEMENTS: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_node_progress_roadmap ON node_progress(roadmap_id)",
    "CREATE INDEX IF NOT EXISTS idx_in_progress_session ON in_progress_node(session_key)",
];

pub(super) fn create_tables(conn: &Connection) -> Result<(), StorageError> {
    for statement in TABLE_STATEMENTS {
        conn.execute(statement, [])?;
    }
    Ok(())
}

pub(super) fn create_indexes(conn: &Connection) -> Result<(), StorageError> {
    for statement in INDEX_STATEMENTS {
        conn.execute(statement, [])?;
    }
    Ok(())
}

pub(super) fn apply_schema_migrations(conn: &Connection) -> Result<(), StorageError> {
    let stored_version = Storage::schema_version(conn)?;

    if stored_version > SCHEMA_VERSION {
        return Err(StorageError::Other(format!(
            "Unsupported database schema version: {stored_version} (max supported: {SCHEMA_VERSION})"
        )));
    }

    if stored_version < SCHEMA_VERSION {
        Storage::set_schema_version(conn, SCHEMA_VERSION)?;
    }
    Ok(())
}
