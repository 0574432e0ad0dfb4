//! HDBSCAN density clustering
//!
//! Steps:
//! 1. Core distance of every point (distance to its `min_samples`-th nearest
//!    neighbour, counting the point itself)
//! 2. Minimum spanning tree of the mutual reachability graph (Prim, dense)
//! 3. Single-linkage hierarchy from the sorted tree edges
//! 4. Condensed tree: splits where both sides reach `min_cluster_size`
//! 5. Excess-of-mass selection of the most stable clusters
//!
//! The root is never selected, so a dataset forming one single blob comes
//! out as noise.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use biblio_common::{AppError, ClusterId, Result, NOISE_CLUSTER};

use crate::{squared_distance, DensityClusterer};

/// Parameters for HDBSCAN clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HdbscanParams {
    /// Minimum number of points to form a cluster
    pub min_cluster_size: usize,

    /// Neighbourhood size of the core distance
    pub min_samples: usize,
}

impl Default for HdbscanParams {
    fn default() -> Self {
        Self {
            min_cluster_size: 10,
            min_samples: 7,
        }
    }
}

impl HdbscanParams {
    #[must_use]
    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = size;
        self
    }

    #[must_use]
    pub fn with_min_samples(mut self, samples: usize) -> Self {
        self.min_samples = samples;
        self
    }

    /// Fails when `min_cluster_size < 2` or `min_samples < 1`
    pub fn validate(&self) -> Result<()> {
        if self.min_cluster_size < 2 {
            return Err(AppError::Validation {
                message: format!("min_cluster_size must be >= 2, got {}", self.min_cluster_size),
                field: Some("min_cluster_size".to_string()),
            });
        }
        if self.min_samples < 1 {
            return Err(AppError::Validation {
                message: "min_samples must be >= 1".to_string(),
                field: Some("min_samples".to_string()),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Hdbscan {
    params: HdbscanParams,
}

impl Hdbscan {
    pub fn new(params: HdbscanParams) -> Self {
        Self { params }
    }
}

impl DensityClusterer for Hdbscan {
    #[instrument(skip(self, data), fields(points = data.len()))]
    fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<ClusterId>> {
        self.params.validate()?;
        let n = data.len();
        if n < self.params.min_cluster_size {
            return Ok(vec![NOISE_CLUSTER; n]);
        }

        let core = core_distances(data, self.params.min_samples);
        let edges = mutual_reachability_mst(data, &core);
        let hierarchy = single_linkage(n, edges);
        let tree = CondensedTree::build(&hierarchy, n, self.params.min_cluster_size);
        let selected = tree.select_eom();
        let labels = tree.label_points(&selected, n);

        debug!(
            condensed = tree.clusters.len(),
            selected = selected.len(),
            noise = labels.iter().filter(|l| **l == NOISE_CLUSTER).count(),
            "Density clustering done"
        );
        Ok(labels)
    }
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    squared_distance(a, b).sqrt()
}

fn core_distances(data: &[Vec<f64>], min_samples: usize) -> Vec<f64> {
    let n = data.len();
    // The point itself is its own first neighbour
    let k = min_samples.min(n).max(1) - 1;
    data.iter()
        .map(|row| {
            let mut distances: Vec<f64> = data.iter().map(|other| distance(row, other)).collect();
            distances.sort_by(f64::total_cmp);
            distances[k]
        })
        .collect()
}

/// Edge `(a, b, weight)` of the spanning tree
type Edge = (usize, usize, f64);

fn mutual_reachability_mst(data: &[Vec<f64>], core: &[f64]) -> Vec<Edge> {
    let n = data.len();
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut parent = vec![0usize; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));

    let mut current = 0;
    in_tree[0] = true;
    for _ in 1..n {
        let mut next = None;
        let mut next_weight = f64::INFINITY;
        for j in 0..n {
            if in_tree[j] {
                continue;
            }
            let reach = distance(&data[current], &data[j]).max(core[current]).max(core[j]);
            if reach < best[j] {
                best[j] = reach;
                parent[j] = current;
            }
            if best[j] < next_weight || next.is_none() {
                next_weight = best[j];
                next = Some(j);
            }
        }
        let Some(j) = next else { break };
        in_tree[j] = true;
        edges.push((parent[j], j, best[j]));
        current = j;
    }
    edges
}

/// Merge node of the single-linkage hierarchy
#[derive(Debug, Clone, Copy)]
struct Merge {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }
}

/// Merges in ascending distance; node `n + k` is the k-th merge
fn single_linkage(n: usize, mut edges: Vec<Edge>) -> Vec<Merge> {
    edges.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut sets = UnionFind::new(2 * n);
    let mut sizes = vec![1usize; 2 * n];
    let mut merges = Vec::with_capacity(edges.len());

    for (a, b, weight) in edges {
        let left = sets.find(a);
        let right = sets.find(b);
        let node = n + merges.len();
        let size = sizes[left] + sizes[right];
        sets.parent[left] = node;
        sets.parent[right] = node;
        sizes[node] = size;
        merges.push(Merge {
            left,
            right,
            distance: weight,
            size,
        });
    }
    merges
}

fn lambda(distance: f64) -> f64 {
    if distance > 0.0 {
        1.0 / distance
    } else {
        f64::MAX
    }
}

#[derive(Debug, Clone)]
struct CondensedCluster {
    parent: Option<usize>,
    birth: f64,
    children: Vec<usize>,
    stability: f64,
}

/// Clusters of the condensed tree (index 0 is the root) and the cluster
/// every point falls out of
struct CondensedTree {
    clusters: Vec<CondensedCluster>,
    point_cluster: Vec<usize>,
}

impl CondensedTree {
    fn build(merges: &[Merge], n: usize, min_cluster_size: usize) -> Self {
        let mut tree = Self {
            clusters: vec![CondensedCluster {
                parent: None,
                birth: 0.0,
                children: Vec::new(),
                stability: 0.0,
            }],
            point_cluster: vec![0; n],
        };
        if merges.is_empty() {
            return tree;
        }
        let root = n + merges.len() - 1;

        let size_of = |node: usize| if node < n { 1 } else { merges[node - n].size };

        let mut stack = vec![(root, 0usize)];
        while let Some((node, cluster)) = stack.pop() {
            if node < n {
                // A lone leaf only happens for a one-point input
                tree.point_cluster[node] = cluster;
                continue;
            }
            let merge = merges[node - n];
            let level = lambda(merge.distance);
            let left_big = size_of(merge.left) >= min_cluster_size;
            let right_big = size_of(merge.right) >= min_cluster_size;

            match (left_big, right_big) {
                (true, true) => {
                    for child in [merge.left, merge.right] {
                        let id = tree.clusters.len();
                        tree.clusters.push(CondensedCluster {
                            parent: Some(cluster),
                            birth: level,
                            children: Vec::new(),
                            stability: 0.0,
                        });
                        tree.clusters[cluster].children.push(id);
                        let birth = tree.clusters[cluster].birth;
                        tree.clusters[cluster].stability += (level - birth) * size_of(child) as f64;
                        stack.push((child, id));
                    }
                }
                (true, false) => {
                    tree.fall_out(merges, n, merge.right, cluster, level);
                    stack.push((merge.left, cluster));
                }
                (false, true) => {
                    tree.fall_out(merges, n, merge.left, cluster, level);
                    stack.push((merge.right, cluster));
                }
                (false, false) => {
                    tree.fall_out(merges, n, merge.left, cluster, level);
                    tree.fall_out(merges, n, merge.right, cluster, level);
                }
            }
        }
        tree
    }

    /// Every point under `node` leaves `cluster` at `level`
    fn fall_out(&mut self, merges: &[Merge], n: usize, node: usize, cluster: usize, level: f64) {
        let birth = self.clusters[cluster].birth;
        let mut stack = vec![node];
        while let Some(node) = stack.pop() {
            if node < n {
                self.point_cluster[node] = cluster;
                self.clusters[cluster].stability += level - birth;
            } else {
                let merge = merges[node - n];
                stack.push(merge.left);
                stack.push(merge.right);
            }
        }
    }

    /// Excess-of-mass selection, root excluded
    fn select_eom(&self) -> Vec<usize> {
        let count = self.clusters.len();
        let mut selected = vec![false; count];
        let mut value = vec![0.0_f64; count];

        // Children always carry larger ids than their parent
        for id in (1..count).rev() {
            let cluster = &self.clusters[id];
            let from_children: f64 = cluster.children.iter().map(|c| value[*c]).sum();
            if cluster.children.is_empty() || cluster.stability >= from_children {
                selected[id] = true;
                value[id] = cluster.stability;
                self.deselect_descendants(id, &mut selected);
            } else {
                value[id] = from_children;
            }
        }

        (1..count).filter(|id| selected[*id]).collect()
    }

    fn deselect_descendants(&self, id: usize, selected: &mut [bool]) {
        let mut stack = self.clusters[id].children.clone();
        while let Some(child) = stack.pop() {
            selected[child] = false;
            stack.extend(self.clusters[child].children.iter().copied());
        }
    }

    /// Label of the selected ancestor of each point, in ascending cluster order
    fn label_points(&self, selected: &[usize], n: usize) -> Vec<ClusterId> {
        let mut label_of = vec![None; self.clusters.len()];
        for (label, id) in selected.iter().enumerate() {
            label_of[*id] = Some(label as ClusterId);
        }

        (0..n)
            .map(|point| {
                let mut cluster = Some(self.point_cluster[point]);
                while let Some(id) = cluster {
                    if let Some(label) = label_of[id] {
                        return label;
                    }
                    cluster = self.clusters[id].parent;
                }
                NOISE_CLUSTER
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFSETS: [(f64, f64); 8] = [
        (0.0, 0.0),
        (0.3, 0.1),
        (-0.2, 0.25),
        (0.1, -0.3),
        (-0.35, -0.1),
        (0.2, 0.35),
        (-0.1, -0.4),
        (0.4, -0.15),
    ];

    fn blob(cx: f64, cy: f64) -> Vec<Vec<f64>> {
        OFFSETS.iter().map(|(dx, dy)| vec![cx + dx, cy + dy]).collect()
    }

    fn clusterer() -> Hdbscan {
        Hdbscan::new(HdbscanParams::default().with_min_cluster_size(5).with_min_samples(3))
    }

    #[test]
    fn test_three_blobs_and_an_outlier() {
        let mut data = blob(0.0, 0.0);
        data.extend(blob(10.0, 0.0));
        data.extend(blob(30.0, 0.0));
        data.push(vec![100.0, 100.0]);

        let labels = clusterer().fit_predict(&data).unwrap();
        assert_eq!(labels.len(), 25);
        assert_eq!(labels[24], NOISE_CLUSTER);

        let mut seen = Vec::new();
        for group in labels[..24].chunks(8) {
            assert!(group.iter().all(|l| *l == group[0]), "blob split: {group:?}");
            assert_ne!(group[0], NOISE_CLUSTER);
            seen.push(group[0]);
        }
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_single_blob_is_noise() {
        let labels = clusterer().fit_predict(&blob(0.0, 0.0)).unwrap();
        assert!(labels.iter().all(|l| *l == NOISE_CLUSTER));
    }

    #[test]
    fn test_too_few_points() {
        let labels = clusterer().fit_predict(&blob(0.0, 0.0)[..3]).unwrap();
        assert_eq!(labels, vec![NOISE_CLUSTER; 3]);
        assert!(clusterer().fit_predict(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_core_distance_counts_the_point_itself() {
        let data = vec![vec![0.0], vec![1.0], vec![3.0]];
        assert_eq!(core_distances(&data, 1), vec![0.0, 0.0, 0.0]);
        assert_eq!(core_distances(&data, 2), vec![1.0, 1.0, 2.0]);
        assert_eq!(core_distances(&data, 10), vec![3.0, 2.0, 3.0]);
    }

    #[test]
    fn test_spanning_tree_has_n_minus_one_edges() {
        let data = blob(0.0, 0.0);
        let core = core_distances(&data, 3);
        let edges = mutual_reachability_mst(&data, &core);
        assert_eq!(edges.len(), data.len() - 1);

        let merges = single_linkage(data.len(), edges);
        assert_eq!(merges.last().map(|m| m.size), Some(8));
    }

    #[test]
    fn test_invalid_params() {
        let bad = Hdbscan::new(HdbscanParams::default().with_min_cluster_size(1));
        assert!(bad.fit_predict(&[vec![0.0]]).is_err());
    }
}
