use super::*;
use rusqlite::OptionalExtension;

pub(super) fn load_node_status(
    conn: &Connection,
    roadmap: &RoadmapId,
) -> Result<RemoteStatus, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT node_id FROM node_progress WHERE roadmap_id = ?1 AND completed = 1",
    )?;
    let rows = stmt.query_map(params![roadmap.0], |row| row.get::<_, String>(0))?;

    let mut completed = HashSet::new();
    for row in rows {
        completed.insert(NodeId(row?));
    }

    let bookmarked = get_favorites(conn, roadmap)?.into_iter().collect();
    Ok(RemoteStatus {
        completed,
        bookmarked,
    })
}

pub(super) fn set_completed(
    conn: &Connection,
    roadmap: &RoadmapId,
    node: &NodeId,
    completed: bool,
) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO node_progress (roadmap_id, node_id, completed) VALUES (?1, ?2, ?3)
         ON CONFLICT(roadmap_id, node_id) DO UPDATE SET completed = excluded.completed",
        params![roadmap.0, node.0, completed],
    )?;
    Ok(())
}

/// Favorites in stored order. A missing row is an empty list.
pub(super) fn get_favorites(
    conn: &Connection,
    roadmap: &RoadmapId,
) -> Result<Vec<NodeId>, StorageError> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT node_ids FROM roadmap_favorite WHERE roadmap_id = ?1",
            params![roadmap.0],
            |row| row.get(0),
        )
        .optional()?;
    match stored {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

/// Re-reads the array and merges one membership change into it. Callers run
/// this inside a transaction.
pub(super) fn set_favorite(
    conn: &Connection,
    roadmap: &RoadmapId,
    node: &NodeId,
    bookmarked: bool,
) -> Result<(), StorageError> {
    let mut favorites = get_favorites(conn, roadmap)?;
    let present = favorites.contains(node);
    match (bookmarked, present) {
        (true, false) => favorites.push(node.clone()),
        (false, true) => favorites.retain(|id| id != node),
        _ => return Ok(()),
    }

    let json = serde_json::to_string(&favorites)?;
    conn.execute(
        "INSERT INTO roadmap_favorite (roadmap_id, node_ids) VALUES (?1, ?2)
         ON CONFLICT(roadmap_id) DO UPDATE SET node_ids = excluded.node_ids",
        params![roadmap.0, json],
    )?;
    tracing::debug!(
        roadmap = %roadmap,
        node = %node,
        bookmarked,
        count = favorites.len(),
        "Updated roadmap favorites"
    );
    Ok(())
}
