use crate::error::SessionError;
use crate::settings::EngineSettings;
use crate::status::{NodeStatusStore, RoadmapProgress, StatusChange};
use parking_lot::{Mutex, MutexGuard};
use pathpdf_core::tree;
use pathpdf_core::{
    NodeId, NodeStatus, RemoteStatus, RoadmapData, RoadmapId, SessionKey, SessionSnapshot,
    StatusField, StatusPatch, Vec2,
};
use pathpdf_events::{Event, EventBus, EventListener};
use pathpdf_graph::{
    Breadcrumb, ExpansionState, GraphLayout, Highlight, LayoutRequest, Layouter,
    PositionOverrides, TreeLayouter, focus,
};
use pathpdf_storage::{RoadmapSource, SessionCache, StatusStore, Storage, StorageError};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

pub type SharedCache = Arc<dyn SessionCache + Send + Sync>;
pub type SharedStatusStore = Arc<dyn StatusStore + Send + Sync>;

/// The persistence a session talks to.
#[derive(Clone)]
pub struct SessionBackends {
    pub cache: SharedCache,
    pub remote: SharedStatusStore,
}

impl SessionBackends {
    pub fn new(cache: SharedCache, remote: SharedStatusStore) -> Self {
        Self { cache, remote }
    }

    /// One SQLite file serving as both local cache and status store.
    pub fn sqlite(storage: Arc<Storage>) -> Self {
        Self {
            cache: storage.clone(),
            remote: storage,
        }
    }
}

/// A remote status write already applied locally, waiting for its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    ticket: u64,
    pub roadmap: RoadmapId,
    pub node: NodeId,
    pub field: StatusField,
    pub value: bool,
    /// Local flags flipped alongside this write, restored if it fails.
    companions: Vec<StatusChange>,
}

impl PendingWrite {
    pub fn patch(&self) -> StatusPatch {
        match self.field {
            StatusField::Bookmarked => StatusPatch::bookmarked(self.value),
            StatusField::Completed | StatusField::InProgress => StatusPatch::completed(self.value),
        }
    }
}

/// What settling a [`PendingWrite`] did to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Confirmed,
    /// The write failed and the local flag went back to the last value the
    /// store confirmed.
    Reverted,
    /// The write failed but a newer write to the same flag is in flight.
    Superseded,
    /// The session was closed before the response arrived, or the write was
    /// already settled.
    Ignored,
}

/// Everything the render surface needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadmapView {
    pub title: String,
    pub layout: GraphLayout,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub selected: Option<NodeId>,
    pub focus_mode: bool,
    pub progress: RoadmapProgress,
    pub status_load_failed: bool,
}

/// Remote writes to one `(node, field)` flag that have not resolved yet.
#[derive(Debug)]
struct FlagWrites {
    /// Last value the store is known to hold: the loaded value until a
    /// write to this flag is confirmed.
    confirmed: bool,
    in_flight: BTreeSet<u64>,
}

impl FlagWrites {
    fn has_newer_than(&self, ticket: u64) -> bool {
        self.in_flight.range(ticket + 1..).next().is_some()
    }
}

struct SessionState {
    roadmap: RoadmapData,
    key: SessionKey,
    node_ids: HashSet<NodeId>,
    expansion: ExpansionState,
    overrides: PositionOverrides,
    statuses: NodeStatusStore,
    status_load_failed: bool,
    selected: Option<NodeId>,
    focus_mode: bool,
    pending: HashMap<(NodeId, StatusField), FlagWrites>,
    next_ticket: u64,
    closed: bool,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            expanded: self.expansion.to_sorted_vec(),
            overrides: self.overrides.to_sorted_map(),
        }
    }

    fn require_node(&self, id: &NodeId) -> Result<(), SessionError> {
        if self.node_ids.contains(id) {
            Ok(())
        } else {
            Err(SessionError::UnknownNode(id.clone()))
        }
    }
}

/// One open roadmap: the tree plus all interaction state around it.
///
/// Expansion and dragged positions are saved to the session cache on every
/// change. Status flags are applied optimistically; remote writes are handed
/// out as [`PendingWrite`]s and reconciled in [`RoadmapSession::settle`].
#[derive(Clone)]
pub struct RoadmapSession {
    id: RoadmapId,
    state: Arc<Mutex<SessionState>>,
    backends: SessionBackends,
    events: EventBus,
    layouter: TreeLayouter,
}

impl RoadmapSession {
    pub fn open(
        source: &dyn RoadmapSource,
        backends: SessionBackends,
        events: EventBus,
        settings: &EngineSettings,
        id: RoadmapId,
    ) -> Result<Self, SessionError> {
        let roadmap = source.load_roadmap(&id)?;
        Ok(Self::from_roadmap(id, roadmap, backends, events, settings))
    }

    /// Builds a session around an already loaded tree. Load failures of
    /// cached or remote state degrade to empty state and are reported on the
    /// event bus.
    pub fn from_roadmap(
        id: RoadmapId,
        roadmap: RoadmapData,
        backends: SessionBackends,
        events: EventBus,
        settings: &EngineSettings,
    ) -> Self {
        let key = settings.session_key_mode.key_for(&id, &roadmap);
        let node_ids = tree::node_ids(&roadmap.root_node);

        let cached = backends
            .cache
            .load_session_state(&key)
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to load session state for {key}: {e}");
                events.publish(Event::ShowWarning {
                    message: format!("Could not restore the saved layout: {e}"),
                });
                SessionSnapshot::default()
            });
        let expansion = ExpansionState::from_ids(
            roadmap.root_node.id.clone(),
            cached
                .expanded
                .into_iter()
                .filter(|node| node_ids.contains(node)),
        );
        let overrides = PositionOverrides::from_map(
            cached
                .overrides
                .into_iter()
                .filter(|(node, _)| node_ids.contains(node)),
        );

        let mut load_errors = Vec::new();
        let in_progress = backends.cache.load_in_progress(&key).unwrap_or_else(|e| {
            load_errors.push(e.to_string());
            HashSet::new()
        });
        let remote = backends.remote.load_node_status(&id).unwrap_or_else(|e| {
            load_errors.push(e.to_string());
            RemoteStatus::default()
        });
        let statuses =
            NodeStatusStore::from_sources(remote, in_progress, settings.completion_policy);

        let status_load_failed = !load_errors.is_empty();
        if status_load_failed {
            let message = load_errors.join("; ");
            tracing::warn!("Failed to load node status for roadmap {id}: {message}");
            events.publish(Event::StatusLoadFailed {
                message: message.clone(),
            });
            events.publish(Event::ShowError {
                message: format!("Could not load your progress: {message}"),
            });
        }

        tracing::info!(
            "Opened roadmap {} ({} nodes, session key {})",
            id,
            node_ids.len(),
            key
        );
        events.publish(Event::RoadmapOpened {
            id: id.clone(),
            title: roadmap.title.clone(),
        });

        Self {
            id,
            state: Arc::new(Mutex::new(SessionState {
                roadmap,
                key,
                node_ids,
                expansion,
                overrides,
                statuses,
                status_load_failed,
                selected: None,
                focus_mode: settings.start_in_focus_mode,
                pending: HashMap::new(),
                next_ticket: 0,
                closed: false,
            })),
            backends,
            events,
            layouter: settings.layout.layouter(),
        }
    }

    pub fn id(&self) -> &RoadmapId {
        &self.id
    }

    pub fn session_key(&self) -> SessionKey {
        self.state.lock().key.clone()
    }

    pub fn roadmap(&self) -> RoadmapData {
        self.state.lock().roadmap.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn open_state(&self) -> Result<MutexGuard<'_, SessionState>, SessionError> {
        let state = self.state.lock();
        if state.closed {
            return Err(SessionError::Closed);
        }
        Ok(state)
    }

    fn persist_layout(&self, state: &SessionState) {
        if let Err(e) = self
            .backends
            .cache
            .save_session_state(&state.key, &state.snapshot())
        {
            tracing::warn!("Failed to save session state for {}: {e}", state.key);
            self.events.publish(Event::ShowWarning {
                message: format!("Could not save the roadmap layout: {e}"),
            });
        }
    }

    fn persist_in_progress(&self, key: &SessionKey, change: &StatusChange) {
        if let Err(e) = self
            .backends
            .cache
            .set_in_progress(key, &change.id, change.value)
        {
            tracing::warn!("Failed to save in-progress flag for {}: {e}", change.id);
            self.events.publish(Event::ShowWarning {
                message: format!("Could not save in-progress state: {e}"),
            });
        }
    }

    fn publish_progress(&self, state: &SessionState) {
        let progress = state.statuses.progress(&state.roadmap.root_node);
        self.events.publish(Event::ProgressChanged {
            completed: progress.completed,
            total: progress.total,
            percent: progress.percent,
        });
    }

    // ========================================================================
    // Expansion
    // ========================================================================

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.state.lock().expansion.is_expanded(id)
    }

    /// Returns whether `id` is expanded afterwards.
    pub fn toggle_expanded(&self, id: &NodeId) -> Result<bool, SessionError> {
        let mut guard = self.open_state()?;
        guard.require_node(id)?;
        let expanded = guard.expansion.toggle(id);
        self.persist_layout(&guard);
        Ok(expanded)
    }

    /// Returns whether anything changed.
    pub fn set_expanded(&self, id: &NodeId, expand: bool) -> Result<bool, SessionError> {
        let mut guard = self.open_state()?;
        guard.require_node(id)?;
        let changed = guard.expansion.set_expanded(id, expand);
        if changed {
            self.persist_layout(&guard);
        }
        Ok(changed)
    }

    pub fn expand_all(&self) -> Result<(), SessionError> {
        let mut guard = self.open_state()?;
        let state = &mut *guard;
        state.expansion.expand_all(&state.roadmap.root_node);
        self.persist_layout(state);
        Ok(())
    }

    pub fn collapse_all(&self) -> Result<(), SessionError> {
        let mut guard = self.open_state()?;
        guard.expansion.collapse_all();
        self.persist_layout(&guard);
        Ok(())
    }

    // ========================================================================
    // Position Overrides
    // ========================================================================

    pub fn position_override(&self, id: &NodeId) -> Option<Vec2> {
        self.state.lock().overrides.get_position(id)
    }

    /// Records a drag end.
    pub fn move_node(&self, id: &NodeId, position: Vec2) -> Result<(), SessionError> {
        let mut guard = self.open_state()?;
        guard.require_node(id)?;
        guard.overrides.set_position(id.clone(), position);
        self.persist_layout(&guard);
        Ok(())
    }

    /// Returns whether `id` had an override.
    pub fn clear_position(&self, id: &NodeId) -> Result<bool, SessionError> {
        let mut guard = self.open_state()?;
        let cleared = guard.overrides.clear(id).is_some();
        if cleared {
            self.persist_layout(&guard);
        }
        Ok(cleared)
    }

    pub fn reset_layout(&self) -> Result<(), SessionError> {
        let mut guard = self.open_state()?;
        tracing::info!(
            "Resetting {} dragged positions for roadmap {}",
            guard.overrides.len(),
            self.id
        );
        guard.overrides.reset();
        self.persist_layout(&guard);
        Ok(())
    }

    // ========================================================================
    // Selection & Focus
    // ========================================================================

    pub fn select(&self, id: Option<NodeId>) -> Result<(), SessionError> {
        let mut guard = self.open_state()?;
        if let Some(id) = &id {
            guard.require_node(id)?;
        }
        guard.selected = id;
        Ok(())
    }

    pub fn set_focus_mode(&self, enabled: bool) -> Result<(), SessionError> {
        let mut guard = self.open_state()?;
        guard.focus_mode = enabled;
        Ok(())
    }

    /// Lays out the current state. The selected node's root path is
    /// highlighted; with focus mode on, the layout is reduced to the
    /// selection and its neighbours.
    pub fn view(&self) -> RoadmapView {
        let guard = self.state.lock();
        let state = &*guard;
        let root = &state.roadmap.root_node;

        let path = state
            .selected
            .as_ref()
            .map(|id| tree::find_path(root, id))
            .unwrap_or_default();
        let highlight = Highlight::along(&path);

        let layout = self.layouter.execute(&LayoutRequest {
            root: Some(root),
            expanded: state.expansion.ids(),
            overrides: state.overrides.as_map(),
            highlight: &highlight,
            statuses: Some(state.statuses.snapshot()),
        });
        let layout = match (&state.selected, state.focus_mode) {
            (Some(selected), true) => focus(&layout, root, selected),
            _ => layout,
        };

        RoadmapView {
            title: state.roadmap.title.clone(),
            layout,
            breadcrumbs: path
                .iter()
                .map(|node| Breadcrumb {
                    id: node.id.clone(),
                    title: node.title.clone(),
                })
                .collect(),
            selected: state.selected.clone(),
            focus_mode: state.focus_mode,
            progress: state.statuses.progress(root),
            status_load_failed: state.status_load_failed,
        }
    }

    // ========================================================================
    // Node Status
    // ========================================================================

    pub fn status_of(&self, id: &NodeId) -> NodeStatus {
        self.state.lock().statuses.status_of(id)
    }

    pub fn progress(&self) -> RoadmapProgress {
        let guard = self.state.lock();
        guard.statuses.progress(&guard.roadmap.root_node)
    }

    /// Applies a status change locally and returns the remote writes it
    /// needs. In-progress changes are saved to the local cache right away.
    pub fn begin_status(
        &self,
        id: &NodeId,
        field: StatusField,
        value: bool,
    ) -> Result<Vec<PendingWrite>, SessionError> {
        let mut guard = self.open_state()?;
        let state = &mut *guard;
        state.require_node(id)?;

        let changes = state.statuses.apply(field, id, value);
        let companions: Vec<StatusChange> = changes
            .iter()
            .filter(|change| !change.is_remote())
            .cloned()
            .collect();
        let mut writes = Vec::new();
        for change in &changes {
            if !change.is_remote() {
                self.persist_in_progress(&state.key, change);
                continue;
            }
            state.next_ticket += 1;
            let ticket = state.next_ticket;
            // With nothing in flight the displayed value is the stored one.
            state
                .pending
                .entry((change.id.clone(), change.field))
                .or_insert_with(|| FlagWrites {
                    confirmed: change.previous,
                    in_flight: BTreeSet::new(),
                })
                .in_flight
                .insert(ticket);
            writes.push(PendingWrite {
                ticket,
                roadmap: self.id.clone(),
                node: change.id.clone(),
                field: change.field,
                value: change.value,
                companions: companions.clone(),
            });
        }

        if changes
            .iter()
            .any(|change| change.field == StatusField::Completed)
        {
            self.publish_progress(state);
        }
        Ok(writes)
    }

    /// Reconciles a remote response. The response that resolves last decides
    /// the stored value; local state follows it once no newer write to the
    /// same flag is in flight. Failures revert to the last confirmed value.
    pub fn settle(&self, write: &PendingWrite, result: Result<(), StorageError>) -> Settlement {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            tracing::debug!(
                "Ignoring {:?} response for {} after close",
                write.field,
                write.node
            );
            return Settlement::Ignored;
        }

        let key = (write.node.clone(), write.field);
        let Some(flag) = state.pending.get_mut(&key) else {
            tracing::debug!("No pending {:?} write for {}", write.field, write.node);
            return Settlement::Ignored;
        };
        if !flag.in_flight.remove(&write.ticket) {
            return Settlement::Ignored;
        }
        if result.is_ok() {
            flag.confirmed = write.value;
        }
        let superseded = flag.has_newer_than(write.ticket);
        let confirmed = flag.confirmed;
        if flag.in_flight.is_empty() {
            state.pending.remove(&key);
        }

        let error = match result {
            Ok(()) => {
                if !superseded {
                    let changes = state.statuses.apply(write.field, &write.node, confirmed);
                    self.after_reconcile(state, &changes);
                }
                return Settlement::Confirmed;
            }
            Err(error) => error,
        };

        let message = error.to_string();
        tracing::warn!(
            "Status write {:?}={} for {} failed: {message}",
            write.field,
            write.value,
            write.node
        );
        self.events.publish(Event::StatusWriteFailed {
            id: write.node.clone(),
            field: write.field,
            message: message.clone(),
        });
        self.events.publish(Event::ShowError {
            message: format!("Could not save your change: {message}"),
        });

        if superseded {
            return Settlement::Superseded;
        }

        let mut reverted = state.statuses.apply(write.field, &write.node, confirmed);
        for companion in &write.companions {
            if state.statuses.get(companion.field, &companion.id) == companion.value {
                reverted.extend(state.statuses.apply(
                    companion.field,
                    &companion.id,
                    companion.previous,
                ));
            }
        }
        self.after_reconcile(state, &reverted);
        Settlement::Reverted
    }

    fn after_reconcile(&self, state: &SessionState, changes: &[StatusChange]) {
        for change in changes.iter().filter(|change| !change.is_remote()) {
            self.persist_in_progress(&state.key, change);
        }
        if changes
            .iter()
            .any(|change| change.field == StatusField::Completed)
        {
            self.publish_progress(state);
        }
    }

    /// Applies, sends and settles in one call.
    fn set_status(&self, id: &NodeId, field: StatusField, value: bool) -> Result<(), SessionError> {
        let writes = self.begin_status(id, field, value)?;

        let mut failure = None;
        for write in writes {
            let result =
                self.backends
                    .remote
                    .mutate_node_status(&write.roadmap, &write.node, write.patch());
            if let Err(e) = &result {
                failure.get_or_insert_with(|| SessionError::WriteFailed {
                    id: write.node.clone(),
                    field: write.field,
                    message: e.to_string(),
                });
            }
            self.settle(&write, result);
        }
        failure.map_or(Ok(()), Err)
    }

    pub fn set_completed(&self, id: &NodeId, completed: bool) -> Result<(), SessionError> {
        self.set_status(id, StatusField::Completed, completed)
    }

    pub fn set_bookmarked(&self, id: &NodeId, bookmarked: bool) -> Result<(), SessionError> {
        self.set_status(id, StatusField::Bookmarked, bookmarked)
    }

    pub fn set_in_progress(&self, id: &NodeId, in_progress: bool) -> Result<(), SessionError> {
        self.set_status(id, StatusField::InProgress, in_progress)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Tears the session down. Responses arriving afterwards are ignored.
    pub fn close(&self) {
        let mut guard = self.state.lock();
        if guard.closed {
            return;
        }
        guard.closed = true;
        guard.pending.clear();
        drop(guard);

        tracing::info!("Closed roadmap {}", self.id);
        self.events.publish(Event::RoadmapClosed {
            id: self.id.clone(),
        });
    }
}

impl EventListener for RoadmapSession {
    fn handle_event(&mut self, event: &Event) {
        let result = match event {
            Event::NodeActivate { id } => self.select(Some(id.clone())),
            Event::NodeDeactivate => self.select(None),
            Event::GraphNodeExpand { id, expand } => self.set_expanded(id, *expand).map(|_| ()),
            Event::GraphNodeToggle { id } => self.toggle_expanded(id).map(|_| ()),
            Event::GraphNodeMove { id, x, y } => self.move_node(id, Vec2::new(*x, *y)),
            Event::ExpandAll => self.expand_all(),
            Event::CollapseAll => self.collapse_all(),
            Event::ResetLayout => self.reset_layout(),
            Event::SetFocusMode(enabled) => self.set_focus_mode(*enabled),
            Event::NodeCompletedSet { id, completed } => self.set_completed(id, *completed),
            Event::NodeBookmarkSet { id, bookmarked } => self.set_bookmarked(id, *bookmarked),
            Event::NodeInProgressSet { id, in_progress } => {
                self.set_in_progress(id, *in_progress)
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to handle {:?}: {e}", event);
        }
    }
}
