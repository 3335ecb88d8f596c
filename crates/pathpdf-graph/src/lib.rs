pub mod expansion;
pub mod focus;
pub mod graph;
pub mod layout;
pub mod overrides;
pub mod preview;

pub use expansion::ExpansionState;
pub use focus::{
    Breadcrumb, FocusSet, Highlight, breadcrumb_trail, breadcrumbs, focus, parent_of,
    path_edge_ids,
};
pub use graph::{GraphEdge, GraphLayout, GraphNode};
pub use layout::{LayoutRequest, Layouter, TreeLayouter, layout};
pub use overrides::PositionOverrides;
pub use pathpdf_core::Vec2;
pub use preview::mini_preview;
