use pathpdf_core::{NodeId, TopicNode, tree};
use std::collections::HashSet;

/// Set of nodes whose children are materialized. The root is always a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionState {
    root: NodeId,
    expanded: HashSet<NodeId>,
}

impl ExpansionState {
    pub fn new(root: NodeId) -> Self {
        let mut expanded = HashSet::new();
        expanded.insert(root.clone());
        Self { root, expanded }
    }

    /// Restores a persisted set, re-seeding the root if it was lost.
    pub fn from_ids(root: NodeId, ids: impl IntoIterator<Item = NodeId>) -> Self {
        let mut state = Self::new(root);
        state.expanded.extend(ids);
        state
    }

    pub fn root(&self) -> &NodeId {
        &self.root
    }

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.expanded.contains(id)
    }

    /// Flips `id` and returns whether it is now expanded. Toggling the root is
    /// a no-op.
    pub fn toggle(&mut self, id: &NodeId) -> bool {
        if id == &self.root {
            return true;
        }
        if !self.expanded.remove(id) {
            self.expanded.insert(id.clone());
            return true;
        }
        false
    }

    /// Returns true if the set changed.
    pub fn set_expanded(&mut self, id: &NodeId, expand: bool) -> bool {
        if expand {
            self.expanded.insert(id.clone())
        } else if id == &self.root {
            false
        } else {
            self.expanded.remove(id)
        }
    }

    pub fn expand_all(&mut self, root: &TopicNode) {
        self.expanded.extend(tree::branch_ids(root));
    }

    pub fn collapse_all(&mut self) {
        self.expanded.retain(|id| id == &self.root);
    }

    pub fn ids(&self) -> &HashSet<NodeId> {
        &self.expanded
    }

    /// Sorted for stable persistence.
    pub fn to_sorted_vec(&self) -> Vec<NodeId> {
        let mut ids: Vec<_> = self.expanded.iter().cloned().collect();
        ids.sort();
        ids
    }
}
