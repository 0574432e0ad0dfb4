//! Cluster assignment artifact

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{ClusterId, PaperId, NOISE_CLUSTER};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Clusters {
    pub clusters: IndexMap<ClusterId, Cluster>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub index: ClusterId,
    #[serde(default)]
    pub points: Vec<Point>,
    pub name: String,
}

/// One paper placed in embedding and projection space
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub paper_id: PaperId,

    /// High-dimensional abstract embedding
    pub embedding: Vec<f32>,

    /// Low-dimensional projected coordinate
    #[serde(rename = "tsne")]
    pub projected: Vec<f64>,

    /// Position of the paper in the projection's traversal order
    pub index: usize,
}

impl Cluster {
    pub fn new(index: ClusterId, points: Vec<Point>) -> Self {
        Self {
            index,
            points,
            name: String::new(),
        }
    }

    pub fn is_noise(&self) -> bool {
        self.index == NOISE_CLUSTER
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Clusters {
    /// Paper to cluster mapping
    ///
    /// A paper listed twice keeps the cluster of its last occurrence.
    pub fn cluster_of(&self) -> HashMap<PaperId, ClusterId> {
        let mut result = HashMap::new();
        for cluster in self.clusters.values() {
            for point in &cluster.points {
                result.insert(point.paper_id.clone(), cluster.index);
            }
        }
        result
    }

    /// Generated names keyed by cluster, in cluster order
    pub fn labels(&self) -> IndexMap<ClusterId, String> {
        self.clusters
            .iter()
            .map(|(id, cluster)| (*id, cluster.name.clone()))
            .collect()
    }

    /// Member counts keyed by cluster, in cluster order
    pub fn paper_counts(&self) -> IndexMap<ClusterId, usize> {
        self.clusters
            .iter()
            .map(|(id, cluster)| (*id, cluster.len()))
            .collect()
    }

    /// Clusters other than noise
    pub fn non_noise(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values().filter(|c| !c.is_noise())
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}
