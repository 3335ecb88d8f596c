use super::*;
use pathpdf_core::{TopicNode, Vec2};
use std::collections::BTreeMap;

fn sample_roadmap() -> RoadmapData {
    RoadmapData::new(
        "Rust",
        TopicNode::new("root", "Rust").with_children(vec![
            TopicNode::new("own", "Ownership"),
            TopicNode::new("traits", "Traits"),
        ]),
    )
}

#[test]
fn test_schema_indexes_are_created() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let conn = storage.conn.lock();

    let mut stmt = conn.prepare("PRAGMA index_list('node_progress')")?;
    let indexes = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    assert!(indexes.iter().any(|name| name == "idx_node_progress_roadmap"));

    assert_eq!(Storage::schema_version(&conn)?, SCHEMA_VERSION);
    Ok(())
}

#[test]
fn test_newer_schema_version_is_rejected() -> Result<(), StorageError> {
    let dir = tempfile::tempdir().map_err(|e| StorageError::Other(e.to_string()))?;
    let path = dir.path().join("roadmaps.db");
    {
        let storage = Storage::open(&path)?;
        Storage::set_schema_version(&storage.conn.lock(), SCHEMA_VERSION + 1)?;
    }

    match Storage::open(&path) {
        Err(StorageError::Other(message)) => assert!(message.contains("schema version")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected newer schema to be rejected"),
    }
    Ok(())
}

#[test]
fn test_roadmap_save_load_and_list() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let id = RoadmapId::from("r1");
    storage.save_roadmap(&id, &sample_roadmap())?;
    storage.save_roadmap(&RoadmapId::from("r2"), &RoadmapData::new("Go", TopicNode::new("g", "Go")))?;

    let loaded = storage.load_roadmap(&id)?;
    assert_eq!(loaded.title, "Rust");
    assert_eq!(loaded.root_node.children.len(), 2);
    assert_eq!(
        loaded.root_node.children[0].parent_id,
        Some(NodeId::from("root"))
    );

    let listed = storage.list_roadmaps()?;
    let titles: Vec<_> = listed.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Rust", "Go"]);
    Ok(())
}

#[test]
fn test_load_missing_roadmap_is_not_found() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    match storage.load_roadmap(&RoadmapId::from("missing")) {
        Err(StorageError::NotFound(_)) => Ok(()),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn test_load_repairs_stored_content() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    storage.conn.lock().execute(
        "INSERT INTO roadmap (id, title, content) VALUES (?1, ?2, ?3)",
        params![
            "raw",
            "Row Title",
            r#"{"rootNode":{"id":"a","children":[{"id":"a"},"junk"]}}"#
        ],
    )?;

    let loaded = storage.load_roadmap(&RoadmapId::from("raw"))?;
    assert_eq!(loaded.title, "Row Title");
    assert_eq!(loaded.root_node.title, pathpdf_core::repair::UNTITLED_NODE);
    assert_eq!(loaded.root_node.children.len(), 1);
    assert_ne!(loaded.root_node.children[0].id, NodeId::from("a"));
    Ok(())
}

#[test]
fn test_session_state_round_trip_and_isolation() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let key = SessionKey::new("Rust");

    assert_eq!(storage.load_session_state(&key)?, SessionSnapshot::default());

    let mut overrides = BTreeMap::new();
    overrides.insert(NodeId::from("own"), Vec2::new(10.0, -4.5));
    let snapshot = SessionSnapshot {
        expanded: vec![NodeId::from("root"), NodeId::from("own")],
        overrides,
    };
    storage.save_session_state(&key, &snapshot)?;

    assert_eq!(storage.load_session_state(&key)?, snapshot);
    assert_eq!(
        storage.load_session_state(&SessionKey::new("Go"))?,
        SessionSnapshot::default()
    );
    Ok(())
}

#[test]
fn test_in_progress_flags() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let key = SessionKey::new("Rust");
    let node = NodeId::from("own");

    storage.set_in_progress(&key, &node, true)?;
    storage.set_in_progress(&key, &node, true)?;
    assert_eq!(storage.load_in_progress(&key)?, HashSet::from([node.clone()]));

    storage.set_in_progress(&key, &node, false)?;
    assert!(storage.load_in_progress(&key)?.is_empty());
    Ok(())
}

#[test]
fn test_completion_and_favorites() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let roadmap = RoadmapId::from("r1");
    let own = NodeId::from("own");
    let traits = NodeId::from("traits");

    storage.mutate_node_status(&roadmap, &own, StatusPatch::completed(true))?;
    storage.mutate_node_status(&roadmap, &own, StatusPatch::bookmarked(true))?;
    storage.mutate_node_status(&roadmap, &traits, StatusPatch::bookmarked(true))?;

    let status = storage.load_node_status(&roadmap)?;
    assert_eq!(status.completed, HashSet::from([own.clone()]));
    assert_eq!(status.bookmarked, HashSet::from([own.clone(), traits.clone()]));

    storage.mutate_node_status(&roadmap, &own, StatusPatch::completed(false))?;
    storage.mutate_node_status(&roadmap, &own, StatusPatch::bookmarked(false))?;

    let status = storage.load_node_status(&roadmap)?;
    assert!(status.completed.is_empty());
    assert_eq!(storage.get_favorites(&roadmap)?, vec![traits]);
    Ok(())
}

#[test]
fn test_favorites_merge_across_handles() -> Result<(), StorageError> {
    let dir = tempfile::tempdir().map_err(|e| StorageError::Other(e.to_string()))?;
    let path = dir.path().join("roadmaps.db");
    let first = Storage::open(&path)?;
    let second = Storage::open(&path)?;
    let roadmap = RoadmapId::from("r1");

    // Both handles read an empty list before writing; neither write may drop the other.
    assert!(first.load_node_status(&roadmap)?.bookmarked.is_empty());
    assert!(second.load_node_status(&roadmap)?.bookmarked.is_empty());
    first.mutate_node_status(&roadmap, &NodeId::from("a"), StatusPatch::bookmarked(true))?;
    second.mutate_node_status(&roadmap, &NodeId::from("b"), StatusPatch::bookmarked(true))?;

    assert_eq!(
        first.get_favorites(&roadmap)?,
        vec![NodeId::from("a"), NodeId::from("b")]
    );
    Ok(())
}

#[test]
fn test_favorite_write_waits_for_concurrent_writer() -> Result<(), StorageError> {
    let dir = tempfile::tempdir().map_err(|e| StorageError::Other(e.to_string()))?;
    let path = dir.path().join("roadmaps.db");
    let storage = Storage::open(&path)?;
    let roadmap = RoadmapId::from("r1");

    let other = Connection::open(&path)?;
    other.execute_batch("BEGIN IMMEDIATE")?;
    std::thread::scope(|scope| -> Result<(), StorageError> {
        let writer = scope.spawn(|| {
            storage.mutate_node_status(&roadmap, &NodeId::from("a"), StatusPatch::bookmarked(true))
        });
        std::thread::sleep(Duration::from_millis(100));
        other.execute(
            "INSERT INTO roadmap_favorite (roadmap_id, node_ids) VALUES (?1, ?2)",
            params![roadmap.0, r#"["seed"]"#],
        )?;
        other.execute_batch("COMMIT")?;
        writer
            .join()
            .map_err(|_| StorageError::Other("writer thread panicked".to_string()))?
    })?;

    assert_eq!(
        storage.get_favorites(&roadmap)?,
        vec![NodeId::from("seed"), NodeId::from("a")]
    );
    Ok(())
}

#[test]
fn test_delete_roadmap_drops_status() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let id = RoadmapId::from("r1");
    storage.save_roadmap(&id, &sample_roadmap())?;
    storage.mutate_node_status(
        &id,
        &NodeId::from("own"),
        StatusPatch {
            completed: Some(true),
            bookmarked: Some(true),
        },
    )?;

    assert!(storage.delete_roadmap(&id)?);
    assert!(!storage.delete_roadmap(&id)?);
    assert_eq!(storage.load_node_status(&id)?, RemoteStatus::default());
    assert!(storage.list_roadmaps()?.is_empty());
    Ok(())
}

#[test]
fn test_clear_removes_everything() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let key = SessionKey::new("Rust");
    storage.save_roadmap(&RoadmapId::from("r1"), &sample_roadmap())?;
    storage.set_in_progress(&key, &NodeId::from("own"), true)?;

    storage.clear()?;
    assert!(storage.list_roadmaps()?.is_empty());
    assert!(storage.load_in_progress(&key)?.is_empty());
    Ok(())
}
