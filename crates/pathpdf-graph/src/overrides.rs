use pathpdf_core::{NodeId, Vec2};
use std::collections::{BTreeMap, HashMap};

/// User-dragged positions. Written once per drag end and never cleared
/// automatically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionOverrides {
    positions: HashMap<NodeId, Vec2>,
}

impl PositionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(positions: impl IntoIterator<Item = (NodeId, Vec2)>) -> Self {
        Self {
            positions: positions.into_iter().collect(),
        }
    }

    /// Returns the position it replaced, if any.
    pub fn set_position(&mut self, id: NodeId, position: Vec2) -> Option<Vec2> {
        self.positions.insert(id, position)
    }

    pub fn get_position(&self, id: &NodeId) -> Option<Vec2> {
        self.positions.get(id).copied()
    }

    pub fn clear(&mut self, id: &NodeId) -> Option<Vec2> {
        self.positions.remove(id)
    }

    pub fn reset(&mut self) {
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn as_map(&self) -> &HashMap<NodeId, Vec2> {
        &self.positions
    }

    pub fn to_sorted_map(&self) -> BTreeMap<NodeId, Vec2> {
        self.positions
            .iter()
            .map(|(id, pos)| (id.clone(), *pos))
            .collect()
    }
}
