//! Directed graph of research axes

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::fmt;

use biblio_common::models::Citation;
use biblio_common::ClusterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStyle {
    /// One color or none
    Filled,
    /// Several colors drawn as wedges
    Wedged,
}

impl NodeStyle {
    pub fn for_colors(count: usize) -> Self {
        if count >= 2 {
            NodeStyle::Wedged
        } else {
            NodeStyle::Filled
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStyle::Filled => "filled",
            NodeStyle::Wedged => "wedged",
        }
    }
}

impl fmt::Display for NodeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A surviving cluster
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub cluster: ClusterId,

    /// Wrapped generated label, the displayed node name
    pub label: String,

    pub paper_count: usize,

    /// Palette colors whose category crossed the threshold, in palette order
    pub colors: Vec<String>,

    pub style: NodeStyle,
}

impl GraphNode {
    /// Graphviz fill color list
    pub fn fill(&self) -> String {
        self.colors.join(":")
    }
}

/// A retained cluster pair
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub citations: Vec<Citation>,
    pub penwidth: f64,
    /// Layout hint
    pub weight: f64,
}

#[derive(Debug, Default)]
pub struct ClusterGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    index: HashMap<ClusterId, NodeIndex>,
}

impl ClusterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, replacing any node of the same cluster
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&ix) = self.index.get(&node.cluster) {
            self.graph[ix] = node;
            return ix;
        }
        let cluster = node.cluster;
        let ix = self.graph.add_node(node);
        self.index.insert(cluster, ix);
        ix
    }

    /// Add an edge between two existing clusters
    ///
    /// Returns false when either end is missing.
    pub fn add_edge(&mut self, source: ClusterId, target: ClusterId, edge: GraphEdge) -> bool {
        match (self.index.get(&source), self.index.get(&target)) {
            (Some(&a), Some(&b)) => {
                self.graph.update_edge(a, b, edge);
                true
            }
            _ => false,
        }
    }

    pub fn node(&self, cluster: ClusterId) -> Option<&GraphNode> {
        self.index.get(&cluster).map(|ix| &self.graph[*ix])
    }

    pub fn edge(&self, source: ClusterId, target: ClusterId) -> Option<&GraphEdge> {
        let a = *self.index.get(&source)?;
        let b = *self.index.get(&target)?;
        self.graph.find_edge(a, b).map(|e| &self.graph[e])
    }

    pub fn contains_node(&self, cluster: ClusterId) -> bool {
        self.index.contains_key(&cluster)
    }

    pub fn contains_edge(&self, source: ClusterId, target: ClusterId) -> bool {
        self.edge(source, target).is_some()
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Edges in insertion order, with their endpoints
    pub fn edges(&self) -> impl Iterator<Item = (&GraphNode, &GraphNode, &GraphEdge)> {
        self.graph
            .edge_references()
            .map(|e| (&self.graph[e.source()], &self.graph[e.target()], e.weight()))
    }

    pub fn clusters(&self) -> Vec<ClusterId> {
        self.nodes().map(|n| n.cluster).collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
