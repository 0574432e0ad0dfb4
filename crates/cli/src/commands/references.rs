use clap::Args;
use std::path::PathBuf;
use tracing::info;

use biblio_common::artifacts::{read_json, write_json};
use biblio_common::cache::DiskCache;
use biblio_common::models::Papers;
use biblio_common::scholar::fetch_all_references;

use crate::services::Services;

#[derive(Debug, Default, Args)]
pub struct FetchReferencesArgs {
    /// Papers snapshot [default: <data>/papers.json]
    #[arg(long)]
    pub papers_input: Option<PathBuf>,

    /// Folder of the reference cache [default: the data folder]
    #[arg(long)]
    pub cache_folder: Option<PathBuf>,

    /// Ignore previously cached references
    #[arg(long)]
    pub no_cache: bool,

    /// References requested per page [default: scholar.page_size]
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output file [default: <data>/references.json]
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub async fn run(args: &FetchReferencesArgs, services: &Services) -> anyhow::Result<()> {
    let config = &services.config;
    let input = args.papers_input.clone().unwrap_or_else(|| config.data.papers_path());
    let out = args.out.clone().unwrap_or_else(|| config.data.references_path());
    let folder = args.cache_folder.clone().unwrap_or_else(|| config.data.cache_path());

    let papers: Papers = read_json(&input).await?;
    let cache = DiskCache::for_papers(&folder, &papers, !args.no_cache)?;

    let client = services.scholar()?;
    let page_size = args.limit.unwrap_or(config.scholar.page_size);
    let references = fetch_all_references(client.as_ref(), &papers, &cache, page_size).await?;

    info!(
        papers = references.len(),
        references = references.reference_count(),
        out = %out.display(),
        "Writing references"
    );
    write_json(&out, &references).await?;
    Ok(())
}
