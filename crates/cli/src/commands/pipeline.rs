use anyhow::Context;
use clap::Args;
use tracing::info;

use super::clusters::GenerateClustersArgs;
use super::fetch_papers::FetchPapersArgs;
use super::graph::GenerateGraphArgs;
use super::references::FetchReferencesArgs;
use super::threats::GenerateThreatScoresArgs;
use super::translations::GenerateTranslationsArgs;
use super::{clusters, fetch_papers, graph, references, threats, translations};
use crate::services::Services;

#[derive(Debug, Default, Args)]
pub struct PipelineArgs {
    /// Search query [default: bioterrorism]
    #[arg(long)]
    pub query: Option<String>,

    /// Stop the search after this many papers
    #[arg(long)]
    pub limit: Option<usize>,

    /// Ignore previously cached references
    #[arg(long)]
    pub no_cache: bool,
}

/// Every stage in order; the first failure aborts the run
pub async fn run(args: &PipelineArgs, services: &Services) -> anyhow::Result<()> {
    let fetch = FetchPapersArgs {
        query: args.query.clone(),
        limit: args.limit,
        out: None,
    };
    fetch_papers::run(&fetch, services).await.context("fetch-papers")?;

    translations::run(&GenerateTranslationsArgs::default(), services)
        .await
        .context("generate-translations")?;

    clusters::run(&GenerateClustersArgs::default(), services)
        .await
        .context("generate-clusters")?;

    threats::run(&GenerateThreatScoresArgs::default(), services)
        .await
        .context("generate-threat-scores")?;

    let refs = FetchReferencesArgs {
        no_cache: args.no_cache,
        ..Default::default()
    };
    references::run(&refs, services).await.context("fetch-references")?;

    graph::run(&GenerateGraphArgs::default(), services)
        .await
        .context("generate-graph")?;

    info!("Pipeline complete");
    Ok(())
}
