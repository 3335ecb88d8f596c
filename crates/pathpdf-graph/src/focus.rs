//! Breadcrumbs, path highlighting and focus-mode reduction.
//!
//! Focus mode is a filter over an already computed [`GraphLayout`]; it never
//! touches expansion state or overrides, so switching it off is just
//! rendering the unfiltered layout again.

use crate::graph::GraphLayout;
use pathpdf_core::tree;
use pathpdf_core::{EdgeId, NodeId, TopicNode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlight {
    pub nodes: HashSet<NodeId>,
    pub edges: HashSet<EdgeId>,
}

impl Highlight {
    pub fn from_edges(edges: impl IntoIterator<Item = EdgeId>) -> Self {
        Self {
            nodes: HashSet::new(),
            edges: edges.into_iter().collect(),
        }
    }

    /// Highlights every node on `path` and the edges joining them.
    pub fn along(path: &[&TopicNode]) -> Self {
        Self {
            nodes: path.iter().map(|node| node.id.clone()).collect(),
            edges: path_edge_ids(path),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub id: NodeId,
    pub title: String,
}

/// Root-to-node path; empty when `id` is unknown.
pub fn breadcrumbs<'t>(root: &'t TopicNode, id: &NodeId) -> Vec<&'t TopicNode> {
    tree::find_path(root, id)
}

pub fn breadcrumb_trail(root: &TopicNode, id: &NodeId) -> Vec<Breadcrumb> {
    breadcrumbs(root, id)
        .into_iter()
        .map(|node| Breadcrumb {
            id: node.id.clone(),
            title: node.title.clone(),
        })
        .collect()
}

pub fn path_edge_ids(path: &[&TopicNode]) -> HashSet<EdgeId> {
    path.windows(2)
        .map(|pair| EdgeId::between(&pair[0].id, &pair[1].id))
        .collect()
}

pub fn parent_of(root: &TopicNode, id: &NodeId) -> Option<NodeId> {
    tree::parent_of(root, id)
}

/// The nodes that stay visible in focus mode: the selection, its parent and
/// its direct children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusSet {
    pub selected: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl FocusSet {
    pub fn for_node(root: &TopicNode, selected: &NodeId) -> Option<Self> {
        let path = tree::find_path(root, selected);
        let node = path.last()?;
        let parent = path
            .len()
            .checked_sub(2)
            .map(|index| path[index].id.clone());
        Some(Self {
            selected: node.id.clone(),
            parent,
            children: node.children.iter().map(|child| child.id.clone()).collect(),
        })
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        &self.selected == id || self.parent.as_ref() == Some(id) || self.children.contains(id)
    }

    fn keeps_edge(&self, source: &NodeId, target: &NodeId) -> bool {
        let into_selection = self.parent.as_ref() == Some(source) && target == &self.selected;
        let out_of_selection = source == &self.selected && self.children.contains(target);
        into_selection || out_of_selection
    }

    pub fn apply(&self, layout: &GraphLayout) -> GraphLayout {
        GraphLayout {
            nodes: layout
                .nodes
                .iter()
                .filter(|node| self.contains(&node.id))
                .cloned()
                .collect(),
            edges: layout
                .edges
                .iter()
                .filter(|edge| self.keeps_edge(&edge.source, &edge.target))
                .cloned()
                .collect(),
        }
    }
}

/// Reduces `layout` to the focus set of `selected`. An unknown selection
/// leaves the layout unfiltered.
pub fn focus(layout: &GraphLayout, root: &TopicNode, selected: &NodeId) -> GraphLayout {
    match FocusSet::for_node(root, selected) {
        Some(set) => set.apply(layout),
        None => {
            tracing::debug!("Focus target {} not in roadmap, showing full graph", selected);
            layout.clone()
        }
    }
}
