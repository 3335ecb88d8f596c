use super::*;
use pathpdf_core::Vec2;
use rusqlite::OptionalExtension;
use std::collections::BTreeMap;

/// A key with no stored row yields an empty snapshot.
pub(super) fn load_session_state(
    conn: &Connection,
    key: &SessionKey,
) -> Result<SessionSnapshot, StorageError> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT expanded, overrides FROM session_state WHERE session_key = ?1",
            params![key.0],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((expanded, overrides)) = row else {
        return Ok(SessionSnapshot::default());
    };

    let expanded: Vec<NodeId> = serde_json::from_str(&expanded)?;
    let overrides: BTreeMap<NodeId, Vec2> = serde_json::from_str(&overrides)?;
    Ok(SessionSnapshot {
        expanded,
        overrides,
    })
}

pub(super) fn save_session_state(
    conn: &Connection,
    key: &SessionKey,
    state: &SessionSnapshot,
) -> Result<(), StorageError> {
    let expanded = serde_json::to_string(&state.expanded)?;
    let overrides = serde_json::to_string(&state.overrides)?;
    conn.execute(
        "INSERT INTO session_state (session_key, expanded, overrides) VALUES (?1, ?2, ?3)
         ON CONFLICT(session_key) DO UPDATE SET
            expanded = excluded.expanded,
            overrides = excluded.overrides",
        params![key.0, expanded, overrides],
    )?;
    Ok(())
}

pub(super) fn load_in_progress(
    conn: &Connection,
    key: &SessionKey,
) -> Result<HashSet<NodeId>, StorageError> {
    let mut stmt = conn.prepare("SELECT node_id FROM in_progress_node WHERE session_key = ?1")?;
    let rows = stmt.query_map(params![key.0], |row| row.get::<_, String>(0))?;

    let mut ids = HashSet::new();
    for row in rows {
        ids.insert(NodeId(row?));
    }
    Ok(ids)
}

pub(super) fn set_in_progress(
    conn: &Connection,
    key: &SessionKey,
    node: &NodeId,
    in_progress: bool,
) -> Result<(), StorageError> {
    if in_progress {
        conn.execute(
            "INSERT OR IGNORE INTO in_progress_node (session_key, node_id) VALUES (?1, ?2)",
            params![key.0, node.0],
        )?;
    } else {
        conn.execute(
            "DELETE FROM in_progress_node WHERE session_key = ?1 AND node_id = ?2",
            params![key.0, node.0],
        )?;
    }
    Ok(())
}
