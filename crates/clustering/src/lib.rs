//! Biblio Clustering
//!
//! Groups papers by the semantic similarity of their abstracts:
//! - Embeddings of translated abstracts
//! - Exact t-SNE projection into a few dimensions
//! - HDBSCAN density clustering of the projection
//! - Assembly into the `Clusters` artifact with generated labels

pub mod assignment;
pub mod hdbscan;
pub mod tsne;

pub use assignment::{assemble_clusters, cluster_papers, label_clusters, ClusterPipeline};
pub use hdbscan::{Hdbscan, HdbscanParams};
pub use tsne::{Tsne, TsneParams};

use biblio_common::{ClusterId, Result};

/// Dimensionality reduction of row vectors
pub trait Projector: Send + Sync {
    /// One output row per input row, in input order
    fn project(&self, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;
}

/// Density clustering of row vectors
pub trait DensityClusterer: Send + Sync {
    /// One label per input row; `-1` marks noise
    fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<ClusterId>>;
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
