use clap::Args;
use std::path::PathBuf;
use tracing::info;

use biblio_common::artifacts::{read_json, write_json};
use biblio_common::context::ThreatScorer;
use biblio_common::models::Clusters;

use crate::services::Services;

#[derive(Debug, Default, Args)]
pub struct GenerateThreatScoresArgs {
    /// Clusters [default: <data>/clusters.json]
    #[arg(long)]
    pub clusters_input: Option<PathBuf>,

    /// Output file [default: <data>/threat_scores.json]
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub async fn run(args: &GenerateThreatScoresArgs, services: &Services) -> anyhow::Result<()> {
    let config = &services.config;
    let input = args.clusters_input.clone().unwrap_or_else(|| config.data.clusters_path());
    let out = args.out.clone().unwrap_or_else(|| config.data.threat_scores_path());

    let clusters: Clusters = read_json(&input).await?;

    let scorer = ThreatScorer::new(services.generator()?, &config.llm.threat_model)?;
    let scores = scorer.score_all(&clusters, config.llm.concurrency).await?;

    info!(clusters = scores.threat_scores.len(), out = %out.display(), "Writing threat scores");
    write_json(&out, &scores).await?;
    Ok(())
}
