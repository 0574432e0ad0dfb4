//! Presentation of graphs and cluster projections

mod dot;
mod scatter;

pub use dot::{render_png, to_dot};
pub use scatter::{scatter_html, PlotlyScript, CSS_COLORS, PLOTLY_CDN};
