//! Roadmap session controller: ties the tree, layout, expansion, overrides
//! and status stores together behind one state object.

pub mod error;
pub mod library;
pub mod session;
pub mod settings;
pub mod status;

pub use error::SessionError;
pub use library::{RoadmapCard, generation_input, import_generated, roadmap_cards};
pub use session::{
    PendingWrite, RoadmapSession, RoadmapView, SessionBackends, Settlement, SharedCache,
    SharedStatusStore,
};
pub use settings::{CompletionPolicy, EngineSettings, LayoutSettings, SessionKeyMode};
pub use status::{NodeStatusStore, RoadmapProgress, StatusChange, percent_complete};
