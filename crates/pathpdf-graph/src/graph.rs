use pathpdf_core::{EdgeId, NodeId, NodeStatus, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub title: String,

    // Visual properties
    pub position: Vec2,
    pub depth: usize,
    pub is_expanded: bool,
    pub has_children: bool,
    pub highlighted: bool,

    pub status: NodeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub highlighted: bool,
}

impl GraphEdge {
    pub fn new(source: NodeId, target: NodeId, highlighted: bool) -> Self {
        Self {
            id: EdgeId::between(&source, &target),
            source,
            target,
            highlighted,
        }
    }
}

/// Flat positioned graph handed to the render surface. Regenerated on every
/// state change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphLayout {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphLayout {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    pub fn get_edge(&self, id: &EdgeId) -> Option<&GraphEdge> {
        self.edges.iter().find(|edge| &edge.id == id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.get_node(id).is_some()
    }

    pub fn node_ids(&self) -> HashSet<NodeId> {
        self.nodes.iter().map(|node| node.id.clone()).collect()
    }

    pub fn edge_ids(&self) -> HashSet<EdgeId> {
        self.edges.iter().map(|edge| edge.id.clone()).collect()
    }
}
