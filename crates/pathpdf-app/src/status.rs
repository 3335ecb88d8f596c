use crate::settings::CompletionPolicy;
use pathpdf_core::tree;
use pathpdf_core::{NodeId, NodeStatus, RemoteStatus, StatusField, StatusSnapshot, TopicNode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One flag flip applied to the local snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub id: NodeId,
    pub field: StatusField,
    pub previous: bool,
    pub value: bool,
}

impl StatusChange {
    /// In-progress lives in the local cache; the other fields are remote.
    pub fn is_remote(&self) -> bool {
        self.field != StatusField::InProgress
    }
}

/// Owns the three status flags for one roadmap and the rule tying
/// completion to in-progress.
#[derive(Debug, Clone, Default)]
pub struct NodeStatusStore {
    snapshot: StatusSnapshot,
    policy: CompletionPolicy,
}

impl NodeStatusStore {
    pub fn new(policy: CompletionPolicy) -> Self {
        Self {
            snapshot: StatusSnapshot::default(),
            policy,
        }
    }

    pub fn from_sources(
        remote: RemoteStatus,
        in_progress: HashSet<NodeId>,
        policy: CompletionPolicy,
    ) -> Self {
        Self {
            snapshot: StatusSnapshot {
                completed: remote.completed,
                bookmarked: remote.bookmarked,
                in_progress,
            },
            policy,
        }
    }

    pub fn policy(&self) -> CompletionPolicy {
        self.policy
    }

    pub fn snapshot(&self) -> &StatusSnapshot {
        &self.snapshot
    }

    pub fn status_of(&self, id: &NodeId) -> NodeStatus {
        self.snapshot.status_of(id)
    }

    pub fn get(&self, field: StatusField, id: &NodeId) -> bool {
        self.snapshot.get(field, id)
    }

    /// Sets `field` and returns every flag that actually changed, the
    /// requested one first. Setting a flag to its current value changes
    /// nothing.
    pub fn apply(&mut self, field: StatusField, id: &NodeId, value: bool) -> Vec<StatusChange> {
        let mut changes = Vec::new();
        self.flip(field, id, value, &mut changes);

        if self.policy == CompletionPolicy::Exclusive && value {
            match field {
                StatusField::Completed => {
                    self.flip(StatusField::InProgress, id, false, &mut changes)
                }
                StatusField::InProgress => {
                    self.flip(StatusField::Completed, id, false, &mut changes)
                }
                StatusField::Bookmarked => {}
            }
        }
        changes
    }

    fn flip(
        &mut self,
        field: StatusField,
        id: &NodeId,
        value: bool,
        changes: &mut Vec<StatusChange>,
    ) {
        let previous = self.snapshot.set(field, id, value);
        if previous != value {
            changes.push(StatusChange {
                id: id.clone(),
                field,
                previous,
                value,
            });
        }
    }

    pub fn progress(&self, root: &TopicNode) -> RoadmapProgress {
        RoadmapProgress::compute(root, &self.snapshot)
    }
}

/// `round(100 * |completed ∩ tree| / |tree|)`, counted over every node
/// regardless of expansion. Halves round up.
pub fn percent_complete(root: &TopicNode, completed: &HashSet<NodeId>) -> u32 {
    let (total, done) = count_completed(root, completed);
    percent(done, total)
}

fn count_completed(root: &TopicNode, completed: &HashSet<NodeId>) -> (usize, usize) {
    tree::fold(root, (0, 0), |(total, done), node| {
        (total + 1, done + usize::from(completed.contains(&node.id)))
    })
}

fn percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((done * 100 + total / 2) / total) as u32
}

/// Dashboard summary of one roadmap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapProgress {
    pub total: usize,
    pub completed: usize,
    pub percent: u32,
    pub bookmarked: usize,
}

impl RoadmapProgress {
    pub fn compute(root: &TopicNode, statuses: &StatusSnapshot) -> Self {
        let (total, completed) = count_completed(root, &statuses.completed);
        let bookmarked = tree::fold(root, 0, |count, node| {
            count + usize::from(statuses.bookmarked.contains(&node.id))
        });
        Self {
            total,
            completed,
            percent: percent(completed, total),
            bookmarked,
        }
    }
}
