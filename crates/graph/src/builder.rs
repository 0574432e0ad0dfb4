//! Graph construction
//!
//! Steps, all over ordered maps:
//! 1. Candidates are every cluster except noise.
//! 2. A pair is retained when it joins two different clusters and passes the
//!    retention policy.
//! 3. With pruning, a candidate survives only with a retained edge (either
//!    direction) to another candidate.
//! 4. Retained pairs between survivors become edges with pen width and
//!    layout weight.
//! 5. Nodes get palette colors for categories whose median judgment is
//!    strictly above the threshold, and their wrapped label.

use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

use biblio_common::config::GraphConfig;
use biblio_common::models::{Citation, Clusters, Papers, ReferencesByPaper, ThreatScores};
use biblio_common::{ClusterId, NOISE_CLUSTER};

use crate::aggregate::{aggregate, restrict_to_snapshot, ClusterPairs, PairKey};
use crate::errors::{GraphError, Result};
use crate::model::{ClusterGraph, GraphEdge, GraphNode, NodeStyle};
use crate::policy::{ClampedTargetWidth, InfluenceOrBreadth, Palette, RetentionPolicy, WidthPolicy};
use crate::stats::median;
use crate::wrap::wrap_label;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphOptions {
    /// Median a category must strictly exceed to color a node
    pub score_threshold: f64,
    pub remove_isolated: bool,
    /// Layout weight multiplier; `None` gives every edge weight 1.0
    pub influence_weight: Option<f64>,
    pub wrap_width: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            score_threshold: 0.75,
            remove_isolated: true,
            influence_weight: Some(1.0 / 8.0),
            wrap_width: 20,
        }
    }
}

impl From<&GraphConfig> for GraphOptions {
    fn from(config: &GraphConfig) -> Self {
        Self {
            score_threshold: config.score_threshold,
            remove_isolated: config.remove_isolated,
            influence_weight: config.influence_weight,
            wrap_width: config.wrap_width,
        }
    }
}

/// Per-cluster inputs of a build
///
/// Candidate clusters are the keys of `paper_counts`, in order.
pub struct GraphInput<'a> {
    pub pairs: &'a ClusterPairs,
    pub paper_counts: &'a IndexMap<ClusterId, usize>,
    pub labels: &'a IndexMap<ClusterId, String>,
    pub scores: &'a ThreatScores,
}

pub struct GraphBuilder {
    retention: Box<dyn RetentionPolicy>,
    width: Box<dyn WidthPolicy>,
    palette: Palette,
    options: GraphOptions,
}

impl GraphBuilder {
    /// Builder with the default policies and palette
    pub fn new(options: GraphOptions) -> Self {
        Self {
            retention: Box::new(InfluenceOrBreadth::default()),
            width: Box::new(ClampedTargetWidth::default()),
            palette: Palette::default(),
            options,
        }
    }

    pub fn from_config(config: &GraphConfig) -> Self {
        Self::new(GraphOptions::from(config))
            .with_retention(InfluenceOrBreadth::from(config))
            .with_width(ClampedTargetWidth::from(config))
    }

    pub fn with_retention(mut self, retention: impl RetentionPolicy + 'static) -> Self {
        self.retention = Box::new(retention);
        self
    }

    pub fn with_width(mut self, width: impl WidthPolicy + 'static) -> Self {
        self.width = Box::new(width);
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// Whether a pair becomes an edge, before pruning
    ///
    /// Self-pairs are rejected without consulting the policy.
    pub fn keep(&self, (source, target): PairKey, citations: &[Citation]) -> bool {
        source != target && !citations.is_empty() && self.retention.retain(citations)
    }

    /// Build the graph from the persisted artifacts of earlier stages
    #[instrument(skip_all, fields(papers = papers.len(), clusters = clusters.len()))]
    pub fn build_from_artifacts(
        &self,
        papers: &Papers,
        references: &ReferencesByPaper,
        clusters: &Clusters,
        scores: &ThreatScores,
    ) -> Result<ClusterGraph> {
        let citations = restrict_to_snapshot(references, papers);
        let pairs = aggregate(&citations, &clusters.cluster_of());
        debug!(pairs = pairs.len(), "Aggregated citations between clusters");

        let paper_counts = clusters.paper_counts();
        let labels = clusters.labels();
        self.build(GraphInput {
            pairs: &pairs,
            paper_counts: &paper_counts,
            labels: &labels,
            scores,
        })
    }

    pub fn build(&self, input: GraphInput<'_>) -> Result<ClusterGraph> {
        let candidates: Vec<ClusterId> = input
            .paper_counts
            .keys()
            .copied()
            .filter(|c| *c != NOISE_CLUSTER)
            .collect();
        let candidate_set: HashSet<ClusterId> = candidates.iter().copied().collect();

        let retained: Vec<(PairKey, &Vec<Citation>)> = input
            .pairs
            .iter()
            .filter(|(key, citations)| self.keep(**key, citations))
            .map(|(key, citations)| (*key, citations))
            .collect();

        let survivors: Vec<ClusterId> = if self.options.remove_isolated {
            candidates
                .into_iter()
                .filter(|c| {
                    retained.iter().any(|((s, t), _)| {
                        (s == c && candidate_set.contains(t)) || (t == c && candidate_set.contains(s))
                    })
                })
                .collect()
        } else {
            candidates
        };

        let mut graph = ClusterGraph::new();
        for cluster in &survivors {
            graph.add_node(self.node(*cluster, &input)?);
        }

        for ((source, target), citations) in retained {
            if !graph.contains_node(source) || !graph.contains_node(target) {
                continue;
            }
            let penwidth = self.width.width(citations);
            let weight = match self.options.influence_weight {
                Some(w) => penwidth * w,
                None => 1.0,
            };
            graph.add_edge(
                source,
                target,
                GraphEdge {
                    citations: citations.clone(),
                    penwidth,
                    weight,
                },
            );
        }

        info!(nodes = graph.node_count(), edges = graph.edge_count(), "Built cluster graph");
        Ok(graph)
    }

    fn node(&self, cluster: ClusterId, input: &GraphInput<'_>) -> Result<GraphNode> {
        let label = input
            .labels
            .get(&cluster)
            .filter(|l| !l.trim().is_empty())
            .ok_or(GraphError::MissingLabel { cluster })?;

        let colors = self.colors(cluster, input.scores);
        Ok(GraphNode {
            cluster,
            label: wrap_label(label, self.options.wrap_width),
            paper_count: input.paper_counts.get(&cluster).copied().unwrap_or(0),
            style: NodeStyle::for_colors(colors.len()),
            colors,
        })
    }

    /// Palette colors of the categories above threshold
    ///
    /// Missing scores and empty judgment sequences contribute no color.
    fn colors(&self, cluster: ClusterId, scores: &ThreatScores) -> Vec<String> {
        let Some(score) = scores.get(cluster) else {
            debug!(cluster, "No threat scores for cluster");
            return Vec::new();
        };

        self.palette
            .iter()
            .filter_map(|(category, color)| match median(score.values(category)) {
                Ok(m) if m > self.options.score_threshold => Some(color.to_string()),
                Ok(_) => None,
                Err(_) => {
                    debug!(cluster, %category, "No parsed judgments");
                    None
                }
            })
            .collect()
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(GraphOptions::default())
    }
}
