//! Graphviz output
//!
//! Node ids are cluster ids and the wrapped label is the displayed text, so
//! clusters sharing a generated label stay distinct nodes.

use std::fmt::Write as _;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::errors::{GraphError, Result};
use crate::model::ClusterGraph;

/// DOT source of the graph
pub fn to_dot(graph: &ClusterGraph) -> String {
    let mut out = String::from("digraph {\n");
    out.push_str("\tnode [fontsize=40, fontfamily=\"FreeMono\", fontweight=\"bold\"];\n");
    out.push_str("\tedge [dir=\"back\"];\n");

    for node in graph.nodes() {
        let _ = writeln!(
            out,
            "\t{} [label={}, fillcolor={}, style={}, tooltip={}];",
            quote(&node.cluster.to_string()),
            quote(&node.label),
            quote(&node.fill()),
            quote(node.style.as_str()),
            quote(&format!("{} papers", node.paper_count)),
        );
    }

    for (source, target, edge) in graph.edges() {
        let _ = writeln!(
            out,
            "\t{} -> {} [penwidth={}, weight={}];",
            quote(&source.cluster.to_string()),
            quote(&target.cluster.to_string()),
            edge.penwidth,
            edge.weight,
        );
    }

    out.push_str("}\n");
    out
}

/// Lay out `dot` with a Graphviz program and write a PNG to `out`
#[instrument(skip(dot), fields(out = %out.display()))]
pub async fn render_png(dot: &str, program: &str, out: &Path) -> Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut child = Command::new(program)
        .arg("-Tpng")
        .arg("-o")
        .arg(out)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| GraphError::Render {
            message: format!("failed to start layout program '{program}': {e}"),
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(dot.as_bytes()).await?;
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(GraphError::Render {
            message: format!(
                "'{program}' exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    debug!("Graph rendered");
    Ok(())
}

fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GraphEdge, GraphNode, NodeStyle};

    fn graph() -> ClusterGraph {
        let mut graph = ClusterGraph::new();
        graph.add_node(GraphNode {
            cluster: 0,
            label: "Smallpox\nEradication".to_string(),
            paper_count: 12,
            colors: vec!["red".to_string(), "green".to_string()],
            style: NodeStyle::Wedged,
        });
        graph.add_node(GraphNode {
            cluster: 1,
            label: "\"Agro\" Terrorism".to_string(),
            paper_count: 3,
            colors: Vec::new(),
            style: NodeStyle::Filled,
        });
        graph.add_edge(
            0,
            1,
            GraphEdge {
                citations: Vec::new(),
                penwidth: 1.5,
                weight: 0.1875,
            },
        );
        graph
    }

    #[test]
    fn test_dot_defaults() {
        let dot = to_dot(&graph());
        assert!(dot.starts_with("digraph {\n"));
        assert!(dot.contains("node [fontsize=40, fontfamily=\"FreeMono\", fontweight=\"bold\"];"));
        assert!(dot.contains("edge [dir=\"back\"];"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_dot_nodes_and_edges() {
        let dot = to_dot(&graph());
        assert!(dot.contains(
            "\"0\" [label=\"Smallpox\\nEradication\", fillcolor=\"red:green\", style=\"wedged\", tooltip=\"12 papers\"];"
        ));
        assert!(dot.contains("\"1\" [label=\"\\\"Agro\\\" Terrorism\", fillcolor=\"\", style=\"filled\""));
        assert!(dot.contains("\"0\" -> \"1\" [penwidth=1.5, weight=0.1875];"));
    }

    #[test]
    fn test_shared_label_keeps_nodes_apart() {
        let mut g = ClusterGraph::new();
        for cluster in [0, 1] {
            g.add_node(GraphNode {
                cluster,
                label: "Biodefense".to_string(),
                paper_count: 4 + cluster as usize,
                colors: Vec::new(),
                style: NodeStyle::Filled,
            });
        }
        g.add_edge(
            0,
            1,
            GraphEdge {
                citations: Vec::new(),
                penwidth: 8.0,
                weight: 1.0,
            },
        );

        let dot = to_dot(&g);
        assert!(dot.contains("\"0\" [label=\"Biodefense\", fillcolor=\"\", style=\"filled\", tooltip=\"4 papers\"];"));
        assert!(dot.contains("\"1\" [label=\"Biodefense\", fillcolor=\"\", style=\"filled\", tooltip=\"5 papers\"];"));
        assert!(dot.contains("\"0\" -> \"1\" [penwidth=8, weight=1];"));
        assert!(!dot.contains("\"Biodefense\" -> "));
    }

    #[test]
    fn test_whole_numbers_render_plainly() {
        let mut g = graph();
        g.add_edge(
            1,
            0,
            GraphEdge {
                citations: Vec::new(),
                penwidth: 8.0,
                weight: 1.0,
            },
        );
        assert!(to_dot(&g).contains("[penwidth=8, weight=1];"));
    }

    #[tokio::test]
    async fn test_missing_layout_program() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_png("digraph {}", "biblio-no-such-layout-program", &dir.path().join("g.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Render { .. }));
    }
}
