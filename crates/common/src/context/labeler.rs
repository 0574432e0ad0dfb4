//! Cluster labeling
//!
//! Names a cluster from a bounded sample of its member titles. Titles are
//! taken in point order, never sampled randomly, so the label is a function
//! of the membership and the sample limit only.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::errors::{AppError, Result};
use crate::llm::{CompletionRequest, TextGenerator};
use crate::models::{Cluster, Translations, NOISE_LABEL};

/// Colon tokens pushed away so titles come out colon-free
const COLON_TOKENS: [&str; 2] = ["25", "1058"];

const MAX_LABEL_TOKENS: usize = 32;

pub struct ClusterLabeler {
    generator: Arc<dyn TextGenerator>,
    model: String,
    sample_limit: usize,
}

impl ClusterLabeler {
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>, sample_limit: usize) -> Self {
        Self {
            generator,
            model: model.into(),
            sample_limit,
        }
    }

    /// Generate the label of `cluster`
    ///
    /// The noise cluster is labeled "Noise" without calling the generator.
    /// An empty completion is an error.
    #[instrument(skip(self, cluster, translations), fields(cluster = cluster.index))]
    pub async fn label(&self, cluster: &Cluster, translations: &Translations) -> Result<String> {
        if cluster.is_noise() {
            return Ok(NOISE_LABEL.to_string());
        }

        let titles = cluster
            .points
            .iter()
            .take(self.sample_limit)
            .map(|point| {
                translations
                    .get(&point.paper_id)
                    .map(|t| t.title.as_str())
                    .ok_or_else(|| AppError::MissingField {
                        field: format!("translation of {}", point.paper_id),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut request = CompletionRequest::new(&self.model, label_prompt(&titles))
            .max_tokens(MAX_LABEL_TOKENS)
            .stop("\n");
        for token in COLON_TOKENS {
            request = request.bias(token, -20);
        }

        let label = self
            .generator
            .complete(request)
            .await?
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| AppError::EmptyCompletion {
                purpose: format!("label of cluster {}", cluster.index),
            })?;

        debug!(label = %label, titles = titles.len(), "Cluster labeled");
        Ok(label)
    }
}

fn label_prompt(titles: &[&str]) -> String {
    format!(
        "Based on the following titles of research papers, generate a concise and informative title \
         for a research axis that encapsulates the common theme. The title should be succinct, \
         informative, and consist of 3 to 10 words. Do not use a colon (:). Here are some examples \
         of good research axis titles:\n\n\
         - Integrated Syndromic Surveillance for Enhanced Public Health Preparedness\n\
         - Innovative Strategies for Rapid Vaccine Development Against Bioterrorism Agents\n\
         - Advances Detection, Prevention, and Vaccine Development for Ebola and Other Hemorrhagic Fever Viruses\n\
         - Evaluation of Biorisk Threats in Food and Waterborne Pathogens\n\n\
         Given these titles of research papers in the cluster:\n\
         {}\n\n\
         Generate a research axis title:",
        titles.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedGenerator;
    use crate::models::{Point, Translation, NOISE_CLUSTER};

    fn fixture(n: usize) -> (Cluster, Translations) {
        let mut translations = Translations::default();
        let points = (0..n)
            .map(|i| {
                let id = format!("p{i}");
                translations.translations.insert(
                    id.clone(),
                    Translation {
                        abstract_text: "abstract".into(),
                        title: format!("Title {i}"),
                    },
                );
                Point {
                    paper_id: id,
                    embedding: vec![0.0],
                    projected: vec![0.0, 0.0, 0.0],
                    index: i,
                }
            })
            .collect();
        (Cluster::new(0, points), translations)
    }

    #[tokio::test]
    async fn test_noise_cluster_skips_generator() {
        let generator = ScriptedGenerator::constant("Should not be used");
        let labeler = ClusterLabeler::new(Arc::new(generator.clone()), "m", 20);
        let (mut cluster, translations) = fixture(3);
        cluster.index = NOISE_CLUSTER;

        let label = labeler.label(&cluster, &translations).await.unwrap();
        assert_eq!(label, "Noise");
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_samples_titles_in_point_order() {
        let generator = ScriptedGenerator::constant("  Biodefense Preparedness  ");
        let labeler = ClusterLabeler::new(Arc::new(generator.clone()), "label-model", 2);
        let (cluster, translations) = fixture(5);

        let label = labeler.label(&cluster, &translations).await.unwrap();
        assert_eq!(label, "Biodefense Preparedness");

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.prompt.contains("Title 0\nTitle 1\n"));
        assert!(!request.prompt.contains("Title 2"));
        assert_eq!(request.max_tokens, Some(32));
        assert_eq!(request.stop, vec!["\n".to_string()]);
        assert_eq!(request.logit_bias["1058"], -20);
        assert_eq!(request.model, "label-model");
    }

    #[tokio::test]
    async fn test_empty_completion_is_fatal() {
        let labeler = ClusterLabeler::new(Arc::new(ScriptedGenerator::new(|_| None)), "m", 20);
        let (cluster, translations) = fixture(2);
        let err = labeler.label(&cluster, &translations).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyCompletion { .. }));

        let blank = ClusterLabeler::new(Arc::new(ScriptedGenerator::constant("  ")), "m", 20);
        assert!(blank.label(&cluster, &translations).await.is_err());
    }
}
