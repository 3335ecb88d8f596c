use crate::focus::Highlight;
use crate::graph::{GraphEdge, GraphLayout, GraphNode};
use pathpdf_core::tree::{self, Walk};
use pathpdf_core::{EdgeId, NodeId, StatusSnapshot, TopicNode, Vec2};
use std::collections::{HashMap, HashSet};

/// Everything a layout pass reads. Nothing here is mutated.
#[derive(Debug, Clone, Copy)]
pub struct LayoutRequest<'a> {
    pub root: Option<&'a TopicNode>,
    pub expanded: &'a HashSet<NodeId>,
    pub overrides: &'a HashMap<NodeId, Vec2>,
    pub highlight: &'a Highlight,
    pub statuses: Option<&'a StatusSnapshot>,
}

pub trait Layouter {
    fn execute(&self, request: &LayoutRequest<'_>) -> GraphLayout;
}

/// Left-to-right tree layout.
///
/// Children sit one `x_step` to the right of their parent and are spread
/// symmetrically around the parent's `y`, `y_step` apart. Collapsed subtrees
/// are omitted entirely. An override replaces a node's own position and its
/// descendants are placed relative to the overridden position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeLayouter {
    pub x_step: f32,
    pub y_step: f32,
    /// Default position of the root.
    pub origin: Vec2,
}

impl Default for TreeLayouter {
    fn default() -> Self {
        Self {
            x_step: Self::DEFAULT_X_STEP,
            y_step: Self::DEFAULT_Y_STEP,
            origin: Vec2::default(),
        }
    }
}

impl TreeLayouter {
    pub const DEFAULT_X_STEP: f32 = 250.0;
    pub const DEFAULT_Y_STEP: f32 = 100.0;

    pub fn new(x_step: f32, y_step: f32) -> Self {
        Self {
            x_step,
            y_step,
            origin: Vec2::default(),
        }
    }

    fn child_position(&self, parent: Vec2, index: usize, sibling_count: usize) -> Vec2 {
        let extent = sibling_count.saturating_sub(1) as f32 * self.y_step;
        Vec2::new(
            parent.x + self.x_step,
            parent.y - extent / 2.0 + index as f32 * self.y_step,
        )
    }
}

impl Layouter for TreeLayouter {
    fn execute(&self, request: &LayoutRequest<'_>) -> GraphLayout {
        let Some(root) = request.root else {
            return GraphLayout::default();
        };

        let mut layout = GraphLayout::default();
        let mut positions: HashMap<&NodeId, Vec2> = HashMap::new();

        tree::walk(root, |node, ctx| {
            let default = match ctx.parent() {
                Some(parent) => {
                    let parent_position = positions
                        .get(&parent.id)
                        .copied()
                        .unwrap_or(self.origin);
                    self.child_position(parent_position, ctx.index, parent.children.len())
                }
                None => self.origin,
            };
            let position = request
                .overrides
                .get(&node.id)
                .copied()
                .unwrap_or(default);
            positions.insert(&node.id, position);

            let is_expanded = request.expanded.contains(&node.id);
            layout.nodes.push(GraphNode {
                id: node.id.clone(),
                title: node.title.clone(),
                position,
                depth: ctx.depth,
                is_expanded,
                has_children: node.has_children(),
                highlighted: request.highlight.nodes.contains(&node.id),
                status: request
                    .statuses
                    .map(|statuses| statuses.status_of(&node.id))
                    .unwrap_or_default(),
            });

            if let Some(parent) = ctx.parent() {
                let mut edge = GraphEdge::new(parent.id.clone(), node.id.clone(), false);
                edge.highlighted = request.highlight.edges.contains(&edge.id);
                layout.edges.push(edge);
            }

            if node.has_children() && is_expanded {
                Walk::Continue
            } else {
                Walk::SkipChildren
            }
        });

        tracing::debug!(
            "Laid out {} nodes and {} edges",
            layout.node_count(),
            layout.edge_count()
        );
        layout
    }
}

/// Lays out with default spacing and no status flags.
pub fn layout(
    root: Option<&TopicNode>,
    expanded: &HashSet<NodeId>,
    overrides: &HashMap<NodeId, Vec2>,
    highlighted_edges: &HashSet<EdgeId>,
) -> GraphLayout {
    let highlight = Highlight::from_edges(highlighted_edges.iter().cloned());
    TreeLayouter::default().execute(&LayoutRequest {
        root,
        expanded,
        overrides,
        highlight: &highlight,
        statuses: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(values: &[&str]) -> HashSet<NodeId> {
        values.iter().map(|v| NodeId::from(*v)).collect()
    }

    /// `id1 -> [id2, id3 -> [id4]]`
    fn scenario_tree() -> TopicNode {
        TopicNode::new("id1", "Root").with_children(vec![
            TopicNode::new("id2", "Left"),
            TopicNode::new("id3", "Right").with_children(vec![TopicNode::new("id4", "Leaf")]),
        ])
    }

    #[test]
    fn test_scenario_expanded_and_collapsed() {
        let root = scenario_tree();
        let none = HashMap::new();
        let no_edges = HashSet::new();

        let open = layout(Some(&root), &ids(&["id1", "id3"]), &none, &no_edges);
        assert_eq!(open.node_ids(), ids(&["id1", "id2", "id3", "id4"]));
        assert_eq!(open.edge_count(), 3);

        let closed = layout(Some(&root), &ids(&["id1"]), &none, &no_edges);
        assert_eq!(closed.node_ids(), ids(&["id1", "id2", "id3"]));
        assert_eq!(closed.edge_count(), 2);
        assert!(!closed.contains(&NodeId::from("id4")));
        assert!(closed.get_edge(&EdgeId("e-id3-id4".to_string())).is_none());
    }

    #[test]
    fn test_default_positions() {
        let root = scenario_tree();
        let result = layout(
            Some(&root),
            &ids(&["id1", "id3"]),
            &HashMap::new(),
            &HashSet::new(),
        );

        let pos = |id: &str| result.get_node(&NodeId::from(id)).unwrap().position;
        assert_eq!(pos("id1"), Vec2::new(0.0, 0.0));
        assert_eq!(pos("id2"), Vec2::new(250.0, -50.0));
        assert_eq!(pos("id3"), Vec2::new(250.0, 50.0));
        assert_eq!(pos("id4"), Vec2::new(500.0, 50.0));

        let id3 = result.get_node(&NodeId::from("id3")).unwrap();
        assert_eq!(id3.depth, 1);
        assert!(id3.is_expanded);
        assert!(id3.has_children);
        let id2 = result.get_node(&NodeId::from("id2")).unwrap();
        assert!(!id2.is_expanded);
        assert!(!id2.has_children);
    }

    #[test]
    fn test_override_moves_node_and_descendants_follow() {
        let root = scenario_tree();
        let mut overrides = HashMap::new();
        overrides.insert(NodeId::from("id3"), Vec2::new(1000.0, 1000.0));

        let result = layout(
            Some(&root),
            &ids(&["id1", "id3"]),
            &overrides,
            &HashSet::new(),
        );
        let pos = |id: &str| result.get_node(&NodeId::from(id)).unwrap().position;
        assert_eq!(pos("id3"), Vec2::new(1000.0, 1000.0));
        assert_eq!(pos("id4"), Vec2::new(1250.0, 1000.0));
        assert_eq!(pos("id2"), Vec2::new(250.0, -50.0));
    }

    #[test]
    fn test_highlighted_edges_and_statuses() {
        let root = scenario_tree();
        let mut highlight = Highlight::from_edges([EdgeId("e-id1-id3".to_string())]);
        highlight.nodes.insert(NodeId::from("id3"));
        let mut statuses = StatusSnapshot::default();
        statuses.completed.insert(NodeId::from("id2"));
        statuses.bookmarked.insert(NodeId::from("id3"));

        let expanded = ids(&["id1"]);
        let overrides = HashMap::new();
        let result = TreeLayouter::default().execute(&LayoutRequest {
            root: Some(&root),
            expanded: &expanded,
            overrides: &overrides,
            highlight: &highlight,
            statuses: Some(&statuses),
        });

        let highlighted: Vec<_> = result
            .edges
            .iter()
            .filter(|e| e.highlighted)
            .map(|e| e.id.0.as_str())
            .collect();
        assert_eq!(highlighted, vec!["e-id1-id3"]);
        assert!(result.get_node(&NodeId::from("id2")).unwrap().status.completed);
        let id3 = result.get_node(&NodeId::from("id3")).unwrap();
        assert!(id3.status.bookmarked);
        assert!(id3.highlighted);
        assert!(!result.get_node(&NodeId::from("id1")).unwrap().highlighted);
    }

    #[test]
    fn test_missing_root_yields_empty_layout() {
        let result = layout(None, &HashSet::new(), &HashMap::new(), &HashSet::new());
        assert!(result.is_empty());
        assert!(result.edges.is_empty());
    }

    #[test]
    fn test_custom_spacing() {
        let root = scenario_tree();
        let layouter = TreeLayouter {
            x_step: 100.0,
            y_step: 40.0,
            origin: Vec2::new(10.0, 10.0),
        };
        let expanded = ids(&["id1"]);
        let overrides = HashMap::new();
        let highlight = Highlight::default();
        let result = layouter.execute(&LayoutRequest {
            root: Some(&root),
            expanded: &expanded,
            overrides: &overrides,
            highlight: &highlight,
            statuses: None,
        });
        let pos = |id: &str| result.get_node(&NodeId::from(id)).unwrap().position;
        assert_eq!(pos("id1"), Vec2::new(10.0, 10.0));
        assert_eq!(pos("id2"), Vec2::new(110.0, -10.0));
        assert_eq!(pos("id3"), Vec2::new(110.0, 30.0));
    }

    /// Builds a tree where node `i + 1` hangs under node `parents[i] % (i + 1)`.
    fn tree_from_parents(parents: &[usize]) -> TopicNode {
        let count = parents.len() + 1;
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (i, parent) in parents.iter().enumerate() {
            children[parent % (i + 1)].push(i + 1);
        }
        fn build(index: usize, children: &[Vec<usize>]) -> TopicNode {
            TopicNode::new(format!("n{index}"), format!("Topic {index}")).with_children(
                children[index]
                    .iter()
                    .map(|&child| build(child, children))
                    .collect(),
            )
        }
        build(0, &children)
    }

    fn tree_strategy() -> impl Strategy<Value = TopicNode> {
        proptest::collection::vec(0usize..64, 0..40).prop_map(|p| tree_from_parents(&p))
    }

    proptest! {
        #[test]
        fn prop_layout_is_idempotent(root in tree_strategy(), drag in -500.0f32..500.0) {
            let expanded: HashSet<NodeId> = tree::branch_ids(&root).into_iter().collect();
            let mut overrides = HashMap::new();
            overrides.insert(NodeId::from("n0"), Vec2::new(drag, -drag));
            let edges = HashSet::new();

            let first = layout(Some(&root), &expanded, &overrides, &edges);
            let second = layout(Some(&root), &expanded, &overrides, &edges);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_root_always_present(root in tree_strategy()) {
            let result = layout(Some(&root), &HashSet::new(), &HashMap::new(), &HashSet::new());
            prop_assert_eq!(result.node_count(), 1);
            prop_assert!(result.contains(&root.id));
        }

        #[test]
        fn prop_fully_expanded_tree_has_one_edge_per_child(root in tree_strategy()) {
            let expanded: HashSet<NodeId> = tree::branch_ids(&root).into_iter().collect();
            let result = layout(Some(&root), &expanded, &HashMap::new(), &HashSet::new());
            prop_assert_eq!(result.node_count(), tree::node_count(&root));
            prop_assert_eq!(result.edge_count(), result.node_count() - 1);
        }

        #[test]
        fn prop_collapse_removes_descendants(root in tree_strategy(), pick in 0usize..64) {
            let branches = tree::branch_ids(&root);
            prop_assume!(!branches.is_empty());
            let collapsed = &branches[pick % branches.len()];

            let mut expanded: HashSet<NodeId> = branches.iter().cloned().collect();
            let full = layout(Some(&root), &expanded, &HashMap::new(), &HashSet::new());
            expanded.remove(collapsed);
            let reduced = layout(Some(&root), &expanded, &HashMap::new(), &HashSet::new());

            let subtree = tree::find_node(&root, collapsed).map(tree::node_ids).unwrap_or_default();
            let mut expected = full.node_ids();
            for id in subtree.iter().filter(|id| *id != collapsed) {
                expected.remove(id);
            }
            prop_assert_eq!(reduced.node_ids(), expected);
        }

        #[test]
        fn prop_override_takes_precedence(root in tree_strategy(), pick in 0usize..64, x in -1e4f32..1e4, y in -1e4f32..1e4) {
            let expanded: HashSet<NodeId> = tree::branch_ids(&root).into_iter().collect();
            let all: Vec<NodeId> = {
                let mut all: Vec<_> = tree::node_ids(&root).into_iter().collect();
                all.sort();
                all
            };
            let target = all[pick % all.len()].clone();
            let mut overrides = HashMap::new();
            overrides.insert(target.clone(), Vec2::new(x, y));

            let result = layout(Some(&root), &expanded, &overrides, &HashSet::new());
            prop_assert_eq!(result.get_node(&target).map(|n| n.position), Some(Vec2::new(x, y)));
        }
    }
}
