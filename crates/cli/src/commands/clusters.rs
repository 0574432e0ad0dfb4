use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use biblio_clustering::{cluster_papers, ClusterPipeline, Hdbscan, HdbscanParams, Tsne, TsneParams};
use biblio_common::artifacts::{read_json, write_json, write_text};
use biblio_common::config::ClusteringConfig;
use biblio_common::context::ClusterLabeler;
use biblio_common::models::{Papers, Translations};
use biblio_common::{AppError, Result};
use biblio_graph::render::{scatter_html, PlotlyScript};

use crate::services::Services;

#[derive(Debug, Default, Args)]
pub struct GenerateClustersArgs {
    /// Papers snapshot [default: <data>/papers.json]
    #[arg(long)]
    pub papers_input: Option<PathBuf>,

    /// Translations [default: <data>/translations.json]
    #[arg(long)]
    pub translations_input: Option<PathBuf>,

    /// Clusters output [default: <data>/clusters.json]
    #[arg(long)]
    pub out_json: Option<PathBuf>,

    /// Interactive view output [default: <data>/clusters.html]
    #[arg(long)]
    pub out_html: Option<PathBuf>,

    /// Projection dimensions [default: clustering.n_dims]
    #[arg(long)]
    pub n_dims: Option<usize>,

    /// Smallest cluster [default: clustering.min_cluster_size]
    #[arg(long)]
    pub min_cluster_size: Option<usize>,

    /// Core distance neighbourhood [default: clustering.min_samples]
    #[arg(long)]
    pub min_samples: Option<usize>,

    /// Local plotly.min.js to embed, for a page that works offline [default: clustering.plotly_js]
    #[arg(long)]
    pub plotly_js: Option<PathBuf>,
}

impl GenerateClustersArgs {
    /// Projection and clustering parameters with flag overrides applied
    pub fn params(&self, config: &ClusteringConfig) -> Result<(TsneParams, HdbscanParams)> {
        let tsne = TsneParams::default()
            .with_n_dims(self.n_dims.unwrap_or(config.n_dims))
            .with_perplexity(config.perplexity)
            .with_iterations(config.iterations)
            .with_seed(config.seed);
        tsne.validate()?;

        let hdbscan = HdbscanParams::default()
            .with_min_cluster_size(self.min_cluster_size.unwrap_or(config.min_cluster_size))
            .with_min_samples(self.min_samples.unwrap_or(config.min_samples));
        hdbscan.validate()?;

        Ok((tsne, hdbscan))
    }
}

/// Plotly.js source of the interactive page
async fn plotly_script(bundle: Option<&Path>) -> Result<PlotlyScript> {
    let Some(path) = bundle else {
        return Ok(PlotlyScript::default());
    };
    let source = tokio::fs::read_to_string(path).await.map_err(|e| AppError::Configuration {
        message: format!("Failed to read Plotly.js bundle '{}': {}", path.display(), e),
    })?;
    debug!(path = %path.display(), bytes = source.len(), "Embedding Plotly.js");
    Ok(PlotlyScript::Inline(source))
}

pub async fn run(args: &GenerateClustersArgs, services: &Services) -> anyhow::Result<()> {
    let config = &services.config;
    let papers_input = args.papers_input.clone().unwrap_or_else(|| config.data.papers_path());
    let translations_input = args
        .translations_input
        .clone()
        .unwrap_or_else(|| config.data.translations_path());
    let out_json = args.out_json.clone().unwrap_or_else(|| config.data.clusters_path());
    let out_html = args.out_html.clone().unwrap_or_else(|| config.data.clusters_html_path());

    let (tsne, hdbscan) = args.params(&config.clustering)?;
    let plotly = plotly_script(args.plotly_js.as_deref().or(config.clustering.plotly_js.as_deref())).await?;

    let papers: Papers = read_json(&papers_input).await?;
    let translations: Translations = read_json(&translations_input).await?;

    let pipeline = ClusterPipeline {
        embedder: services.embedder()?,
        projector: Arc::new(Tsne::new(tsne)),
        clusterer: Arc::new(Hdbscan::new(hdbscan)),
        labeler: ClusterLabeler::new(
            services.generator()?,
            &config.llm.label_model,
            config.clustering.title_sample_limit,
        ),
        concurrency: config.llm.concurrency,
    };
    let clusters = cluster_papers(&pipeline, &papers, &translations).await?;

    info!(clusters = clusters.len(), out = %out_json.display(), "Writing clusters");
    write_json(&out_json, &clusters).await?;

    info!(out = %out_html.display(), "Writing interactive clusters");
    write_text(&out_html, &scatter_html(&clusters, &plotly)?).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = GenerateClustersArgs {
            n_dims: Some(2),
            min_samples: Some(3),
            ..Default::default()
        };
        let (tsne, hdbscan) = args.params(&ClusteringConfig::default()).unwrap();
        assert_eq!(tsne.n_dims, 2);
        assert_eq!(tsne.perplexity, 30.0);
        assert_eq!(hdbscan.min_samples, 3);
        assert_eq!(hdbscan.min_cluster_size, 10);
    }

    #[tokio::test]
    async fn test_plotly_bundle_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("plotly.min.js");
        std::fs::write(&bundle, "window.Plotly = {};").unwrap();

        assert_eq!(plotly_script(None).await.unwrap(), PlotlyScript::default());
        assert_eq!(
            plotly_script(Some(bundle.as_path())).await.unwrap(),
            PlotlyScript::Inline("window.Plotly = {};".to_string())
        );
        assert!(matches!(
            plotly_script(Some(dir.path().join("missing.js").as_path())).await,
            Err(AppError::Configuration { .. })
        ));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = GenerateClustersArgs {
            min_cluster_size: Some(1),
            ..Default::default()
        };
        assert!(args.params(&ClusteringConfig::default()).is_err());
    }
}
