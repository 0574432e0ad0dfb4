//! Stage commands
//!
//! Every flag is optional and falls back to the configuration, so `pipeline`
//! runs each stage with default arguments.

use anyhow::Context;
use clap::Subcommand;

use biblio_common::AppError;

use crate::services::Services;

pub mod clusters;
pub mod fetch_papers;
pub mod graph;
pub mod pipeline;
pub mod references;
pub mod threats;
pub mod translations;

#[derive(Subcommand)]
pub enum Commands {
    /// Search papers and write the papers snapshot
    FetchPapers(fetch_papers::FetchPapersArgs),

    /// Translate abstracts and titles into the target language
    GenerateTranslations(translations::GenerateTranslationsArgs),

    /// Fetch outgoing references of every paper in the snapshot
    FetchReferences(references::FetchReferencesArgs),

    /// Cluster translated abstracts and write the interactive 3D view
    GenerateClusters(clusters::GenerateClustersArgs),

    /// Score every cluster label with the expert panel
    GenerateThreatScores(threats::GenerateThreatScoresArgs),

    /// Build and render the citation graph between clusters
    GenerateGraph(graph::GenerateGraphArgs),

    /// Run every stage in order
    Pipeline(pipeline::PipelineArgs),
}

pub async fn run(command: &Commands, services: &Services) -> anyhow::Result<()> {
    match command {
        Commands::FetchPapers(args) => fetch_papers::run(args, services).await.context("fetch-papers"),
        Commands::GenerateTranslations(args) => {
            translations::run(args, services).await.context("generate-translations")
        }
        Commands::FetchReferences(args) => references::run(args, services).await.context("fetch-references"),
        Commands::GenerateClusters(args) => clusters::run(args, services).await.context("generate-clusters"),
        Commands::GenerateThreatScores(args) => {
            threats::run(args, services).await.context("generate-threat-scores")
        }
        Commands::GenerateGraph(args) => graph::run(args, services).await.context("generate-graph"),
        Commands::Pipeline(args) => pipeline::run(args, services).await,
    }
}

/// Process exit code of a failed run
///
/// The first `AppError` in the chain decides; anything else exits with 1.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|e| e.downcast_ref::<AppError>())
        .map(AppError::exit_code)
        .unwrap_or(1)
}
