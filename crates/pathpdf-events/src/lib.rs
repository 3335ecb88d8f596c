use crossbeam_channel::{unbounded, Receiver, Sender};
use pathpdf_core::{NodeId, RoadmapId, StatusField};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Selection
    NodeActivate {
        id: NodeId,
    },
    NodeDeactivate,

    // Graph
    GraphNodeExpand {
        id: NodeId,
        expand: bool,
    },
    GraphNodeToggle {
        id: NodeId,
    },
    /// Emitted on drag end only, never per drag move.
    GraphNodeMove {
        id: NodeId,
        x: f32,
        y: f32,
    },
    ExpandAll,
    CollapseAll,
    /// Drop every dragged position for the open roadmap.
    ResetLayout,
    SetFocusMode(bool),

    // ========================================================================
    // Node Status Events
    // ========================================================================
    NodeCompletedSet {
        id: NodeId,
        completed: bool,
    },
    NodeBookmarkSet {
        id: NodeId,
        bookmarked: bool,
    },
    NodeInProgressSet {
        id: NodeId,
        in_progress: bool,
    },
    ProgressChanged {
        completed: usize,
        total: usize,
        percent: u32,
    },
    StatusLoadFailed {
        message: String,
    },
    StatusWriteFailed {
        id: NodeId,
        field: StatusField,
        message: String,
    },

    // Session
    RoadmapOpened {
        id: RoadmapId,
        title: String,
    },
    RoadmapClosed {
        id: RoadmapId,
    },

    // Notifications
    ShowInfo {
        message: String,
    },
    ShowWarning {
        message: String,
    },
    ShowError {
        message: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Drains everything currently queued without blocking.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }

    /// Dispatch all pending events to a listener.
    /// This is useful for processing events in the UI loop.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }
}

/// Trait for components that respond to events.
/// Implement this to receive events from the EventBus.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}
