use clap::Args;
use std::path::PathBuf;
use tracing::info;

use biblio_common::artifacts::write_json;
use biblio_common::BibliographicSource;

use crate::services::Services;

pub const DEFAULT_QUERY: &str = "bioterrorism";

#[derive(Debug, Default, Args)]
pub struct FetchPapersArgs {
    /// Search query [default: bioterrorism]
    #[arg(long)]
    pub query: Option<String>,

    /// Stop after this many papers (every page when absent)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output file [default: <data>/papers.json]
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl FetchPapersArgs {
    pub fn query(&self) -> &str {
        self.query.as_deref().unwrap_or(DEFAULT_QUERY)
    }
}

pub async fn run(args: &FetchPapersArgs, services: &Services) -> anyhow::Result<()> {
    let out = args.out.clone().unwrap_or_else(|| services.config.data.papers_path());

    info!(query = args.query(), limit = ?args.limit, "Fetching papers");
    let papers = services.scholar()?.search_papers(args.query(), args.limit).await?;

    info!(papers = papers.len(), out = %out.display(), "Writing papers");
    write_json(&out, &papers).await?;
    Ok(())
}
