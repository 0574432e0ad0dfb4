use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use biblio_common::artifacts::{read_json, write_json};
use biblio_common::context::Translator;
use biblio_common::lang::WhatlangDetector;
use biblio_common::models::Papers;

use crate::services::Services;

#[derive(Debug, Default, Args)]
pub struct GenerateTranslationsArgs {
    /// Papers snapshot [default: <data>/papers.json]
    #[arg(long)]
    pub papers_input: Option<PathBuf>,

    /// Output file [default: <data>/translations.json]
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub async fn run(args: &GenerateTranslationsArgs, services: &Services) -> anyhow::Result<()> {
    let config = &services.config;
    let input = args.papers_input.clone().unwrap_or_else(|| config.data.papers_path());
    let out = args.out.clone().unwrap_or_else(|| config.data.translations_path());

    let papers: Papers = read_json(&input).await?;

    let translator = Translator::new(
        services.generator()?,
        Arc::new(WhatlangDetector::new(config.translation.min_confidence)),
        &config.llm.translation_model,
        &config.translation.target_language,
    );
    let translations = translator.translate_all(&papers, config.llm.concurrency).await?;

    info!(translations = translations.len(), out = %out.display(), "Writing translations");
    write_json(&out, &translations).await?;
    Ok(())
}
