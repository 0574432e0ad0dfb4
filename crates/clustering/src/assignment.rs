//! Cluster assignment
//!
//! Turns per-paper embeddings, projected coordinates and density labels into
//! the `Clusters` artifact. Clusters appear in the order their label is first
//! met while walking papers in snapshot order, and points keep that order.

use futures::{stream, StreamExt, TryStreamExt};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{info, instrument};

use biblio_common::context::ClusterLabeler;
use biblio_common::models::{Cluster, Clusters, Papers, Point, Translations};
use biblio_common::{AppError, ClusterId, Embedder, PaperId, Result};

use crate::{DensityClusterer, Projector};

/// Services used to cluster a snapshot
pub struct ClusterPipeline {
    pub embedder: Arc<dyn Embedder>,
    pub projector: Arc<dyn Projector>,
    pub clusterer: Arc<dyn DensityClusterer>,
    pub labeler: ClusterLabeler,
    /// Labeling requests in flight at once
    pub concurrency: usize,
}

/// Cluster every translated paper of the snapshot
///
/// Papers without a translation are left out.
#[instrument(skip_all, fields(papers = papers.len()))]
pub async fn cluster_papers(
    pipeline: &ClusterPipeline,
    papers: &Papers,
    translations: &Translations,
) -> Result<Clusters> {
    let (paper_ids, abstracts): (Vec<PaperId>, Vec<String>) = papers
        .papers
        .keys()
        .filter_map(|id| {
            translations
                .get(id)
                .map(|t| (id.clone(), t.abstract_text.clone()))
        })
        .unzip();

    info!(papers = paper_ids.len(), model = pipeline.embedder.model_name(), "Computing embeddings of abstracts");
    let embeddings = pipeline.embedder.embed_batch(&abstracts).await?;

    info!("Computing projection of embeddings");
    let rows: Vec<Vec<f64>> = embeddings
        .iter()
        .map(|e| e.iter().map(|v| f64::from(*v)).collect())
        .collect();
    let projected = pipeline.projector.project(&rows)?;

    info!("Computing density clusters of projection");
    let labels = pipeline.clusterer.fit_predict(&projected)?;

    let mut clusters = assemble_clusters(&paper_ids, embeddings, projected, &labels)?;
    label_clusters(&mut clusters, &pipeline.labeler, translations, pipeline.concurrency).await?;
    Ok(clusters)
}

/// Group points by density label
///
/// All inputs are indexed by traversal position and must have equal length.
pub fn assemble_clusters(
    paper_ids: &[PaperId],
    embeddings: Vec<Vec<f32>>,
    projected: Vec<Vec<f64>>,
    labels: &[ClusterId],
) -> Result<Clusters> {
    let n = paper_ids.len();
    if embeddings.len() != n || projected.len() != n || labels.len() != n {
        return Err(AppError::Validation {
            message: format!(
                "{} papers but {} embeddings, {} projections and {} labels",
                n,
                embeddings.len(),
                projected.len(),
                labels.len()
            ),
            field: None,
        });
    }

    let mut grouped: IndexMap<ClusterId, Vec<Point>> = IndexMap::new();
    for (index, ((paper_id, embedding), projected)) in paper_ids
        .iter()
        .zip(embeddings)
        .zip(projected)
        .enumerate()
    {
        grouped.entry(labels[index]).or_default().push(Point {
            paper_id: paper_id.clone(),
            embedding,
            projected,
            index,
        });
    }

    let clusters = grouped
        .into_iter()
        .map(|(id, points)| (id, Cluster::new(id, points)))
        .collect();
    Ok(Clusters { clusters })
}

/// Name every cluster, keeping cluster order
pub async fn label_clusters(
    clusters: &mut Clusters,
    labeler: &ClusterLabeler,
    translations: &Translations,
    concurrency: usize,
) -> Result<()> {
    let total = clusters.len();
    let names: Vec<String> = stream::iter(clusters.clusters.values())
        .map(|cluster| labeler.label(cluster, translations))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    for (cluster, name) in clusters.clusters.values_mut().zip(names) {
        cluster.name = name;
    }
    info!(done = total, total, "Generated cluster titles");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblio_common::embeddings::MockEmbedder;
    use biblio_common::llm::ScriptedGenerator;
    use biblio_common::models::{Paper, Translation};
    use biblio_common::NOISE_CLUSTER;

    struct FirstColumns(usize);

    impl Projector for FirstColumns {
        fn project(&self, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
            Ok(data.iter().map(|row| row[..self.0].to_vec()).collect())
        }
    }

    /// Labels fixed by position
    struct Fixed(Vec<ClusterId>);

    impl DensityClusterer for Fixed {
        fn fit_predict(&self, _data: &[Vec<f64>]) -> Result<Vec<ClusterId>> {
            Ok(self.0.clone())
        }
    }

    fn ids(ids: &[&str]) -> Vec<PaperId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_clusters_in_first_appearance_order() {
        let labels = [2, NOISE_CLUSTER, 0, 2, 0];
        let clusters = assemble_clusters(
            &ids(&["a", "b", "c", "d", "e"]),
            vec![vec![0.0]; 5],
            (0..5).map(|i| vec![i as f64, 0.0, 0.0]).collect(),
            &labels,
        )
        .unwrap();

        assert_eq!(clusters.clusters.keys().copied().collect::<Vec<_>>(), vec![2, NOISE_CLUSTER, 0]);
        let two = &clusters.clusters[&2];
        assert_eq!(two.points.iter().map(|p| p.paper_id.as_str()).collect::<Vec<_>>(), vec!["a", "d"]);
        assert_eq!(two.points[1].index, 3);
        assert_eq!(two.points[1].projected, vec![3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_length_mismatch() {
        let err = assemble_clusters(&ids(&["a", "b"]), vec![vec![0.0]; 2], vec![vec![0.0]; 2], &[0]);
        assert!(matches!(err, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_cluster_papers_skips_untranslated() {
        let papers: Papers = vec![
            Paper::new("a", "A").with_abstract("alpha"),
            Paper::new("b", "B").with_abstract("beta"),
            Paper::new("c", "C"),
            Paper::new("d", "D").with_abstract("delta"),
        ]
        .into_iter()
        .collect();

        let mut translations = Translations::default();
        for id in ["a", "b", "d"] {
            translations.translations.insert(
                id.to_string(),
                Translation {
                    abstract_text: format!("abstract {id}"),
                    title: format!("Title {id}"),
                },
            );
        }

        let generator = ScriptedGenerator::constant("Outbreak Response");
        let pipeline = ClusterPipeline {
            embedder: Arc::new(MockEmbedder::new(8)),
            projector: Arc::new(FirstColumns(3)),
            clusterer: Arc::new(Fixed(vec![0, NOISE_CLUSTER, 0])),
            labeler: ClusterLabeler::new(Arc::new(generator.clone()), "m", 20),
            concurrency: 2,
        };

        let clusters = cluster_papers(&pipeline, &papers, &translations).await.unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters.clusters[&0].name, "Outbreak Response");
        assert_eq!(clusters.clusters[&NOISE_CLUSTER].name, "Noise");

        let zero: Vec<_> = clusters.clusters[&0].points.iter().map(|p| p.paper_id.as_str()).collect();
        assert_eq!(zero, vec!["a", "d"]);
        assert_eq!(clusters.clusters[&0].points[0].embedding.len(), 8);
        assert_eq!(generator.requests().len(), 1);
    }
}
