//! Prompt-driven operations
//!
//! Thin wrappers over a `TextGenerator`:
//! - Abstract and title translation
//! - Cluster labeling from member titles
//! - Threat scoring of a cluster label by a simulated expert panel

mod labeler;
mod threat;
mod translator;

pub use labeler::ClusterLabeler;
pub use threat::{ThreatScorer, PANEL_SIZE};
pub use translator::Translator;
