use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

pub mod error;
pub mod repair;
pub mod response;
pub mod tree;

pub use error::TreeError;
pub use repair::{repair_roadmap, repair_topic};
pub use response::{chunk_content, parse_roadmap_response};
pub use tree::{Walk, WalkContext};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a parent -> child edge, always `e-{parent}-{child}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn between(parent: &NodeId, child: &NodeId) -> Self {
        Self(format!("e-{parent}-{child}"))
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoadmapId(pub String);

impl fmt::Display for RoadmapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoadmapId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Namespace for locally cached per-roadmap state (expansion, overrides, in-progress).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(pub String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

// ============================================================================
// Roadmap Tree
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Article,
    Video,
    Course,
    Documentation,
    #[default]
    Other,
}

impl ResourceKind {
    /// Lenient mapping used by repair; unknown labels become `Other`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "article" => ResourceKind::Article,
            "video" => ResourceKind::Video,
            "course" => ResourceKind::Course,
            "documentation" | "docs" => ResourceKind::Documentation,
            _ => ResourceKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub label: String,
    pub url: String,
    pub free: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicImage {
    pub url: String,
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicNode {
    pub id: NodeId,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<TopicImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_study_time: Option<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub children: Vec<TopicNode>,
    /// Derived during repair; traversal is authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
}

impl TopicNode {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(id),
            title: title.into(),
            description: String::new(),
            detailed_description: None,
            image: None,
            code_example: None,
            difficulty: None,
            estimated_study_time: None,
            resources: Vec::new(),
            children: Vec::new(),
            parent_id: None,
        }
    }

    pub fn with_children(mut self, children: Vec<TopicNode>) -> Self {
        self.children = children;
        self
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapData {
    pub title: String,
    pub root_node: TopicNode,
}

impl RoadmapData {
    pub fn new(title: impl Into<String>, root_node: TopicNode) -> Self {
        Self {
            title: title.into(),
            root_node,
        }
    }

    /// Hex SHA-256 of the canonical JSON form. Regenerated roadmaps with the
    /// same title hash differently.
    pub fn content_hash(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapSummary {
    pub id: RoadmapId,
    pub title: String,
}

// ============================================================================
// Node Status
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeStatus {
    pub completed: bool,
    pub in_progress: bool,
    pub bookmarked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusField {
    Completed,
    InProgress,
    Bookmarked,
}

/// Partial update sent to the remote status store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPatch {
    pub completed: Option<bool>,
    pub bookmarked: Option<bool>,
}

impl StatusPatch {
    pub fn completed(value: bool) -> Self {
        Self {
            completed: Some(value),
            bookmarked: None,
        }
    }

    pub fn bookmarked(value: bool) -> Self {
        Self {
            completed: None,
            bookmarked: Some(value),
        }
    }
}

/// The remote half of node status: completion rows and the favorites array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStatus {
    pub completed: HashSet<NodeId>,
    pub bookmarked: HashSet<NodeId>,
}

/// Combined view of every status source, consulted by the layout engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub completed: HashSet<NodeId>,
    pub bookmarked: HashSet<NodeId>,
    pub in_progress: HashSet<NodeId>,
}

impl StatusSnapshot {
    pub fn status_of(&self, id: &NodeId) -> NodeStatus {
        NodeStatus {
            completed: self.completed.contains(id),
            in_progress: self.in_progress.contains(id),
            bookmarked: self.bookmarked.contains(id),
        }
    }

    pub fn get(&self, field: StatusField, id: &NodeId) -> bool {
        self.set_for(field).contains(id)
    }

    /// Returns the previous value.
    pub fn set(&mut self, field: StatusField, id: &NodeId, value: bool) -> bool {
        let set = self.set_for_mut(field);
        let previous = set.contains(id);
        if value {
            set.insert(id.clone());
        } else {
            set.remove(id);
        }
        previous
    }

    fn set_for(&self, field: StatusField) -> &HashSet<NodeId> {
        match field {
            StatusField::Completed => &self.completed,
            StatusField::InProgress => &self.in_progress,
            StatusField::Bookmarked => &self.bookmarked,
        }
    }

    fn set_for_mut(&mut self, field: StatusField) -> &mut HashSet<NodeId> {
        match field {
            StatusField::Completed => &mut self.completed,
            StatusField::InProgress => &mut self.in_progress,
            StatusField::Bookmarked => &mut self.bookmarked,
        }
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Per-roadmap bundle cached locally: which nodes are open and where the user
/// dragged them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub expanded: Vec<NodeId>,
    pub overrides: BTreeMap<NodeId, Vec2>,
}
