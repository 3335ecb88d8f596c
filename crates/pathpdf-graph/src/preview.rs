use crate::graph::{GraphEdge, GraphLayout, GraphNode};
use pathpdf_core::{NodeStatus, TopicNode, Vec2};

pub const PREVIEW_CHILD_LIMIT: usize = 4;
const PREVIEW_ROOT: Vec2 = Vec2 { x: 60.0, y: 40.0 };
const PREVIEW_CHILD_X: f32 = 180.0;
const PREVIEW_CHILD_TOP: f32 = 20.0;
const PREVIEW_CHILD_SPACING: f32 = 40.0;

/// Thumbnail graph for roadmap listings: the root and its first few children
/// at fixed positions, no interaction state.
pub fn mini_preview(root: Option<&TopicNode>) -> GraphLayout {
    let Some(root) = root else {
        return GraphLayout::default();
    };

    let mut preview = GraphLayout::default();
    preview.nodes.push(preview_node(root, PREVIEW_ROOT, 0));

    for (index, child) in root.children.iter().take(PREVIEW_CHILD_LIMIT).enumerate() {
        let position = Vec2::new(
            PREVIEW_CHILD_X,
            PREVIEW_CHILD_TOP + index as f32 * PREVIEW_CHILD_SPACING,
        );
        preview.nodes.push(preview_node(child, position, 1));
        preview
            .edges
            .push(GraphEdge::new(root.id.clone(), child.id.clone(), false));
    }
    preview
}

fn preview_node(node: &TopicNode, position: Vec2, depth: usize) -> GraphNode {
    GraphNode {
        id: node.id.clone(),
        title: node.title.clone(),
        position,
        depth,
        is_expanded: false,
        has_children: node.has_children(),
        highlighted: false,
        status: NodeStatus::default(),
    }
}
