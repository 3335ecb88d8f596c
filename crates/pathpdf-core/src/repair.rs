//! Structural repair of generated roadmap trees.
//!
//! Generated JSON is loosely shaped: ids go missing or repeat, arrays come
//! back as `null`, titles are blank. Repair never fails on a node; it only
//! rejects input that has no root at all.

use crate::{
    NodeId, Resource, ResourceKind, RoadmapData, TopicImage, TopicNode, TreeError,
};
use serde_json::{Map, Value};
use std::collections::HashSet;

pub const UNTITLED_ROADMAP: &str = "Untitled Roadmap";
pub const UNTITLED_NODE: &str = "Untitled Node";
pub const NO_DESCRIPTION: &str = "No description available.";

pub fn repair_roadmap(value: &Value) -> Result<RoadmapData, TreeError> {
    let Some(object) = value.as_object() else {
        return Err(TreeError::InvalidStructure(
            "expected a JSON object".to_string(),
        ));
    };
    let root = object
        .get("rootNode")
        .filter(|root| root.is_object())
        .ok_or_else(|| TreeError::InvalidStructure("missing rootNode".to_string()))?;

    let title = string_field(object, "title").unwrap_or_else(|| {
        tracing::warn!("Roadmap has no title, using placeholder");
        UNTITLED_ROADMAP.to_string()
    });

    Ok(RoadmapData {
        title,
        root_node: repair_topic(root),
    })
}

/// Repairs a single subtree, treating `value` as the root.
pub fn repair_topic(value: &Value) -> TopicNode {
    let mut seen = HashSet::new();
    repair_node(value, None, &mut seen)
}

fn repair_node(value: &Value, parent: Option<&NodeId>, seen: &mut HashSet<NodeId>) -> TopicNode {
    let empty = Map::new();
    let object = value.as_object().unwrap_or(&empty);

    let id = match id_field(object) {
        Some(id) if !seen.contains(&id) => id,
        Some(id) => {
            let replacement = synthesize_id(seen);
            tracing::warn!("Duplicate node id {} replaced with {}", id, replacement);
            replacement
        }
        None => synthesize_id(seen),
    };
    seen.insert(id.clone());

    let resources = match object.get("resources") {
        Some(Value::Array(items)) => items.iter().filter_map(repair_resource).collect(),
        _ => Vec::new(),
    };

    let children = match object.get("children") {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| {
                let keep = item.is_object();
                if !keep {
                    tracing::warn!("Dropping non-object child under node {}", id);
                }
                keep
            })
            .map(|item| repair_node(item, Some(&id), seen))
            .collect(),
        _ => Vec::new(),
    };

    TopicNode {
        title: string_field(object, "title").unwrap_or_else(|| UNTITLED_NODE.to_string()),
        description: string_field(object, "description")
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        detailed_description: string_field(object, "detailedDescription"),
        image: object
            .get("image")
            .and_then(Value::as_object)
            .map(repair_image),
        code_example: string_field(object, "codeExample"),
        difficulty: string_field(object, "difficulty"),
        estimated_study_time: string_field(object, "estimatedStudyTime"),
        resources,
        children,
        parent_id: parent.cloned(),
        id,
    }
}

fn repair_image(object: &Map<String, Value>) -> TopicImage {
    TopicImage {
        url: string_field(object, "url").unwrap_or_default(),
        alt: string_field(object, "alt").unwrap_or_default(),
        caption: string_field(object, "caption"),
    }
}

fn repair_resource(value: &Value) -> Option<Resource> {
    let object = value.as_object()?;
    Some(Resource {
        kind: string_field(object, "type")
            .map(|kind| ResourceKind::parse(&kind))
            .unwrap_or_default(),
        label: string_field(object, "label").unwrap_or_default(),
        url: string_field(object, "url").unwrap_or_default(),
        free: object.get("free").and_then(Value::as_bool).unwrap_or(false),
        discount: string_field(object, "discount"),
    })
}

fn id_field(object: &Map<String, Value>) -> Option<NodeId> {
    match object.get("id")? {
        Value::String(id) if !id.trim().is_empty() => Some(NodeId(id.trim().to_string())),
        Value::Number(id) => Some(NodeId(id.to_string())),
        _ => None,
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn synthesize_id(seen: &HashSet<NodeId>) -> NodeId {
    loop {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        let candidate = NodeId(format!("node-{}", &raw[..9]));
        if !seen.contains(&candidate) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree;
    use serde_json::json;

    #[test]
    fn test_root_missing_id_and_children() {
        let repaired = repair_roadmap(&json!({
            "title": "Physics",
            "rootNode": { "title": "Mechanics" }
        }))
        .unwrap();

        let root = &repaired.root_node;
        assert!(!root.id.0.is_empty());
        assert!(root.children.is_empty());
        assert!(root.resources.is_empty());
        assert_eq!(root.description, NO_DESCRIPTION);
        assert_eq!(root.parent_id, None);
    }

    #[test]
    fn test_duplicate_ids_are_resynthesized() {
        let root = repair_topic(&json!({
            "id": "node-1",
            "title": "Root",
            "children": [
                { "id": "node-2", "title": "A" },
                { "id": "node-2", "title": "B", "children": [{ "id": "node-1" }] }
            ]
        }));

        assert_eq!(root.id.0, "node-1");
        assert_eq!(root.children[0].id.0, "node-2");
        assert_ne!(root.children[1].id.0, "node-2");
        assert_eq!(tree::node_ids(&root).len(), tree::node_count(&root));
        assert_eq!(root.children[1].children[0].title, UNTITLED_NODE);
    }

    #[test]
    fn test_parent_ids_are_derived() {
        let root = repair_topic(&json!({
            "id": "a",
            "parentId": "bogus",
            "children": [{ "id": "b", "parentId": "wrong", "children": [{ "id": "c" }] }]
        }));
        assert_eq!(root.parent_id, None);
        assert_eq!(root.children[0].parent_id, Some(NodeId::from("a")));
        assert_eq!(root.children[0].children[0].parent_id, Some(NodeId::from("b")));
    }

    #[test]
    fn test_non_array_fields_coerced() {
        let root = repair_topic(&json!({
            "id": 7,
            "title": "",
            "children": "none",
            "resources": { "label": "x" },
            "image": { "url": "https://img" }
        }));
        assert_eq!(root.id.0, "7");
        assert_eq!(root.title, UNTITLED_NODE);
        assert!(root.children.is_empty());
        assert!(root.resources.is_empty());
        let image = root.image.unwrap();
        assert_eq!(image.url, "https://img");
        assert_eq!(image.alt, "");
        assert_eq!(image.caption, None);
    }

    #[test]
    fn test_resources_repaired() {
        let root = repair_topic(&json!({
            "id": "r",
            "resources": [
                { "type": "Video", "label": "Talk", "url": "https://v", "free": true },
                { "type": "podcast", "label": "Pod" },
                42
            ]
        }));
        assert_eq!(root.resources.len(), 2);
        assert_eq!(root.resources[0].kind, ResourceKind::Video);
        assert!(root.resources[0].free);
        assert_eq!(root.resources[1].kind, ResourceKind::Other);
        assert!(!root.resources[1].free);
    }

    #[test]
    fn test_missing_root_is_rejected() {
        assert!(matches!(
            repair_roadmap(&json!({ "title": "x" })),
            Err(TreeError::InvalidStructure(_))
        ));
        assert!(matches!(
            repair_roadmap(&json!([1, 2])),
            Err(TreeError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_missing_title_gets_placeholder() {
        let repaired = repair_roadmap(&json!({ "rootNode": { "id": "n" } })).unwrap();
        assert_eq!(repaired.title, UNTITLED_ROADMAP);
    }
}
