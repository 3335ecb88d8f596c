use super::*;
use pathpdf_core::repair_roadmap;
use rusqlite::OptionalExtension;

pub(super) fn save_roadmap(
    conn: &Connection,
    id: &RoadmapId,
    roadmap: &RoadmapData,
) -> Result<(), StorageError> {
    let content = serde_json::to_string(roadmap)?;
    conn.execute(
        "INSERT INTO roadmap (id, title, content) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET title = excluded.title, content = excluded.content",
        params![id.0, roadmap.title, content],
    )?;
    Ok(())
}

/// Loads and repairs stored content. A row whose content lacks a title
/// borrows the row title before repair fills in a placeholder.
pub(super) fn load_roadmap(conn: &Connection, id: &RoadmapId) -> Result<RoadmapData, StorageError> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT title, content FROM roadmap WHERE id = ?1",
            params![id.0],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((title, content)) = row else {
        return Err(StorageError::NotFound(format!("roadmap {id}")));
    };

    let mut value: serde_json::Value = serde_json::from_str(&content)?;
    if let Some(object) = value.as_object_mut() {
        let has_title = object
            .get("title")
            .and_then(|t| t.as_str())
            .is_some_and(|t| !t.trim().is_empty());
        if !has_title {
            object.insert("title".to_string(), serde_json::Value::String(title));
        }
    }
    Ok(repair_roadmap(&value)?)
}

pub(super) fn list_roadmaps(conn: &Connection) -> Result<Vec<RoadmapSummary>, StorageError> {
    let mut stmt = conn.prepare("SELECT id, title FROM roadmap ORDER BY rowid")?;
    let rows = stmt.query_map([], |row| {
        Ok(RoadmapSummary {
            id: RoadmapId(row.get(0)?),
            title: row.get(1)?,
        })
    })?;

    let mut summaries = Vec::new();
    for row in rows {
        summaries.push(row?);
    }
    Ok(summaries)
}

pub(super) fn delete_roadmap(conn: &Connection, id: &RoadmapId) -> Result<bool, StorageError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM node_progress WHERE roadmap_id = ?1",
        params![id.0],
    )?;
    tx.execute(
        "DELETE FROM roadmap_favorite WHERE roadmap_id = ?1",
        params![id.0],
    )?;
    let deleted = tx.execute("DELETE FROM roadmap WHERE id = ?1", params![id.0])?;
    tx.commit()?;
    Ok(deleted > 0)
}
