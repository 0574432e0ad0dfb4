use clap::Args;
use std::path::PathBuf;
use tracing::info;
use validator::Validate;

use biblio_common::artifacts::{read_json, write_text};
use biblio_common::config::GraphConfig;
use biblio_common::models::{Clusters, Papers, ReferencesByPaper, ThreatScores};
use biblio_common::{AppError, Result};
use biblio_graph::render::{render_png, to_dot};
use biblio_graph::GraphBuilder;

use crate::services::Services;

#[derive(Debug, Default, Args)]
pub struct GenerateGraphArgs {
    /// Papers snapshot [default: <data>/papers.json]
    #[arg(long)]
    pub papers_input: Option<PathBuf>,

    /// References [default: <data>/references.json]
    #[arg(long)]
    pub references_input: Option<PathBuf>,

    /// Clusters [default: <data>/clusters.json]
    #[arg(long)]
    pub clusters_input: Option<PathBuf>,

    /// Threat scores [default: <data>/threat_scores.json]
    #[arg(long)]
    pub threat_input: Option<PathBuf>,

    /// Median a threat category must exceed to color a node [default: graph.score_threshold]
    #[arg(long)]
    pub threshold_threat_color: Option<f64>,

    /// Keep clusters without any retained edge
    #[arg(long)]
    pub no_remove_isolated_nodes: bool,

    /// Layout weight multiplier of edge widths [default: graph.influence_weight]
    #[arg(long, conflicts_with = "no_influence_weight")]
    pub influence_weight: Option<f64>,

    /// Give every edge the same layout weight
    #[arg(long)]
    pub no_influence_weight: bool,

    /// Also write the DOT source here
    #[arg(long)]
    pub dot_out: Option<PathBuf>,

    /// Rendered image [default: <data>/graph.png]
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl GenerateGraphArgs {
    /// Graph settings with flag overrides applied
    pub fn graph_config(&self, base: &GraphConfig) -> Result<GraphConfig> {
        let mut config = base.clone();
        if let Some(threshold) = self.threshold_threat_color {
            config.score_threshold = threshold;
        }
        if self.no_remove_isolated_nodes {
            config.remove_isolated = false;
        }
        if let Some(weight) = self.influence_weight {
            config.influence_weight = Some(weight);
        }
        if self.no_influence_weight {
            config.influence_weight = None;
        }
        config.validate()?;
        Ok(config)
    }
}

pub async fn run(args: &GenerateGraphArgs, services: &Services) -> anyhow::Result<()> {
    let data = &services.config.data;
    let graph_config = args.graph_config(&services.config.graph)?;
    let out = args.out.clone().unwrap_or_else(|| data.graph_path());

    let papers: Papers = read_json(args.papers_input.clone().unwrap_or_else(|| data.papers_path())).await?;
    let references: ReferencesByPaper =
        read_json(args.references_input.clone().unwrap_or_else(|| data.references_path())).await?;
    let clusters: Clusters = read_json(args.clusters_input.clone().unwrap_or_else(|| data.clusters_path())).await?;
    let scores: ThreatScores =
        read_json(args.threat_input.clone().unwrap_or_else(|| data.threat_scores_path())).await?;

    info!("Generating graph");
    let graph = GraphBuilder::from_config(&graph_config)
        .build_from_artifacts(&papers, &references, &clusters, &scores)
        .map_err(AppError::from)?;
    let dot = to_dot(&graph);

    if let Some(dot_out) = &args.dot_out {
        info!(out = %dot_out.display(), "Writing graph source");
        write_text(dot_out, &dot).await?;
    }

    info!(out = %out.display(), program = %graph_config.layout_program, "Writing graph");
    render_png(&dot, &graph_config.layout_program, &out)
        .await
        .map_err(AppError::from)?;
    Ok(())
}
