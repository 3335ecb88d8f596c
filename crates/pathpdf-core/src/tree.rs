//! Depth-first traversal shared by layout, breadcrumbs, parent lookup,
//! repair checks and completion accounting.

use crate::{NodeId, TopicNode};
use std::collections::HashSet;

/// Visitor verdict for [`walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    SkipChildren,
    Stop,
}

/// Where the visited node sits in the tree.
#[derive(Debug, Clone, Copy)]
pub struct WalkContext<'t, 'p> {
    pub depth: usize,
    /// Position among its siblings.
    pub index: usize,
    /// Ancestors from the root down to the parent.
    pub ancestors: &'p [&'t TopicNode],
}

impl<'t> WalkContext<'t, '_> {
    pub fn parent(&self) -> Option<&'t TopicNode> {
        self.ancestors.last().copied()
    }
}

/// Pre-order walk in child order.
pub fn walk<'t, F>(root: &'t TopicNode, mut visit: F)
where
    F: FnMut(&'t TopicNode, &WalkContext<'t, '_>) -> Walk,
{
    let mut ancestors = Vec::new();
    walk_inner(root, 0, &mut ancestors, &mut visit);
}

fn walk_inner<'t, F>(
    node: &'t TopicNode,
    index: usize,
    ancestors: &mut Vec<&'t TopicNode>,
    visit: &mut F,
) -> bool
where
    F: FnMut(&'t TopicNode, &WalkContext<'t, '_>) -> Walk,
{
    let ctx = WalkContext {
        depth: ancestors.len(),
        index,
        ancestors: ancestors.as_slice(),
    };
    match visit(node, &ctx) {
        Walk::Stop => return false,
        Walk::SkipChildren => return true,
        Walk::Continue => {}
    }

    ancestors.push(node);
    for (child_index, child) in node.children.iter().enumerate() {
        if !walk_inner(child, child_index, ancestors, visit) {
            ancestors.pop();
            return false;
        }
    }
    ancestors.pop();
    true
}

/// Folds every node reachable from `root`, in pre-order.
pub fn fold<'t, T, F>(root: &'t TopicNode, init: T, mut f: F) -> T
where
    F: FnMut(T, &'t TopicNode) -> T,
{
    fold_inner(root, init, &mut f)
}

fn fold_inner<'t, T, F>(node: &'t TopicNode, acc: T, f: &mut F) -> T
where
    F: FnMut(T, &'t TopicNode) -> T,
{
    let mut acc = f(acc, node);
    for child in &node.children {
        acc = fold_inner(child, acc, f);
    }
    acc
}

/// Root-to-node path, or empty when `id` is not in the tree.
pub fn find_path<'t>(root: &'t TopicNode, id: &NodeId) -> Vec<&'t TopicNode> {
    let mut path = Vec::new();
    walk(root, |node, ctx| {
        if &node.id == id {
            path = ctx.ancestors.to_vec();
            path.push(node);
            Walk::Stop
        } else {
            Walk::Continue
        }
    });
    path
}

pub fn find_node<'t>(root: &'t TopicNode, id: &NodeId) -> Option<&'t TopicNode> {
    let mut found = None;
    walk(root, |node, _| {
        if &node.id == id {
            found = Some(node);
            Walk::Stop
        } else {
            Walk::Continue
        }
    });
    found
}

/// Immediate parent id; `None` for the root and for unknown ids.
pub fn parent_of(root: &TopicNode, id: &NodeId) -> Option<NodeId> {
    let mut parent = None;
    walk(root, |node, ctx| {
        if &node.id == id {
            parent = ctx.parent().map(|p| p.id.clone());
            Walk::Stop
        } else {
            Walk::Continue
        }
    });
    parent
}

pub fn node_ids(root: &TopicNode) -> HashSet<NodeId> {
    fold(root, HashSet::new(), |mut ids, node| {
        ids.insert(node.id.clone());
        ids
    })
}

pub fn node_count(root: &TopicNode) -> usize {
    fold(root, 0, |count, _| count + 1)
}

/// Every node that has at least one child.
pub fn branch_ids(root: &TopicNode) -> Vec<NodeId> {
    fold(root, Vec::new(), |mut ids, node| {
        if node.has_children() {
            ids.push(node.id.clone());
        }
        ids
    })
}
