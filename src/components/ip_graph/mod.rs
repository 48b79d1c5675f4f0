mod bindings;
mod component;
mod error;
mod layout;
mod model;
mod render;
mod state;
mod types;
mod visualizer;

pub use bindings::IpGraph;
pub use component::{GraphRequest, IpGraphCanvas};
pub use error::GraphError;
pub use layout::{ForceLayout, LayoutConfig};
pub use model::build_graph;
pub use state::{GraphScene, VisualizerConfig};
pub use types::{
	EdgeKind, GraphData, GraphEdge, GraphNode, GraphSummary, NodeRole, RelationshipList,
	RelationshipRecord, RootData,
};
pub use visualizer::{IpGraphVisualizer, NODE_CLICK_EVENT};
