//! Pipeline data model
//!
//! Every persisted artifact is an envelope struct around an insertion-ordered
//! map, so a JSON round trip preserves both content and iteration order.

mod cluster;
mod paper;
mod reference;
mod threat;
mod translation;

pub use cluster::{Cluster, Clusters, Point};
pub use paper::{FieldOfStudy, Journal, Paper, Papers, PAPER_FIELDS};
pub use reference::{Citation, PaperRef, Reference, References, ReferencesByPaper, REFERENCE_FIELDS};
pub use threat::{ThreatCategory, ThreatScore, ThreatScores};
pub use translation::{Translation, Translations};

/// Stable bibliographic identifier of a paper
pub type PaperId = String;

/// Cluster identifier assigned by density clustering
pub type ClusterId = i32;

/// Label of papers that density clustering left unclustered
pub const NOISE_CLUSTER: ClusterId = -1;

/// Label shown for the noise cluster instead of a generated title
pub const NOISE_LABEL: &str = "Noise";
