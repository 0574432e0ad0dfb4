//! Biblio Graph
//!
//! Turns papers, citations, clusters and threat scores into a directed graph
//! of research axes:
//! - Citation aggregation into cluster pairs
//! - Pair retention, isolated-node pruning and visual attributes
//! - Graphviz DOT output and PNG rendering
//! - Interactive 3D scatter of the cluster projection

pub mod aggregate;
pub mod builder;
pub mod errors;
pub mod model;
pub mod policy;
pub mod render;
pub mod stats;
pub mod wrap;

pub use aggregate::{aggregate, restrict_to_snapshot, CitationsByPaper, ClusterPairs, PairKey};
pub use builder::{GraphBuilder, GraphInput, GraphOptions};
pub use errors::{GraphError, Result};
pub use model::{ClusterGraph, GraphEdge, GraphNode, NodeStyle};
pub use policy::{ClampedTargetWidth, InfluenceOrBreadth, Palette, RetentionPolicy, WidthPolicy};
pub use render::{render_png, scatter_html, to_dot, PlotlyScript};
pub use stats::median;
pub use wrap::{wrap, wrap_label};
