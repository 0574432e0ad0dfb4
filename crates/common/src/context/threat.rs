//! Threat scoring by a simulated expert panel

use futures::{stream, StreamExt, TryStreamExt};
use regex_lite::Regex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::errors::{AppError, Result};
use crate::llm::{CompletionRequest, TextGenerator};
use crate::models::{ClusterId, Clusters, ThreatCategory, ThreatScore, ThreatScores};

/// Number of experts the prompt asks for
pub const PANEL_SIZE: usize = 10;

const EXPERT_LINE: &str = r"Expert \d+: Viral - (?P<viral>\d\.\d+), Bacterial - (?P<bacterial>\d\.\d+), Toxin - (?P<toxin>\d\.\d+), Fungal - (?P<fungal>\d\.\d+), Prion - (?P<prion>\d\.\d+)";

pub struct ThreatScorer {
    generator: Arc<dyn TextGenerator>,
    model: String,
    expert_line: Regex,
}

impl ThreatScorer {
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>) -> Result<Self> {
        let expert_line = Regex::new(EXPERT_LINE).map_err(|e| AppError::Internal {
            message: format!("Invalid expert line pattern: {}", e),
        })?;
        Ok(Self {
            generator,
            model: model.into(),
            expert_line,
        })
    }

    /// Score a cluster label
    ///
    /// Unparseable lines contribute nothing. A response without content
    /// yields empty sequences, which is not the same as zero scores.
    #[instrument(skip(self))]
    pub async fn score(&self, label: &str) -> Result<ThreatScore> {
        let request = CompletionRequest::new(&self.model, threat_prompt(label)).stop("\n\n");

        match self.generator.complete(request).await? {
            Some(text) => {
                let score = self.parse(&text);
                debug!(experts = score.panel_size(), "Threat response parsed");
                Ok(score)
            }
            None => {
                warn!("Empty threat scoring response");
                Ok(ThreatScore::empty())
            }
        }
    }

    /// Score every cluster by its label, keeping cluster order
    pub async fn score_all(&self, clusters: &Clusters, concurrency: usize) -> Result<ThreatScores> {
        let total = clusters.len();
        let mut done = 0usize;

        let threat_scores = stream::iter(clusters.clusters.values())
            .map(|cluster| async move {
                let score = self.score(&cluster.name).await?;
                Ok::<(ClusterId, ThreatScore), AppError>((cluster.index, score))
            })
            .buffered(concurrency.max(1))
            .inspect_ok(|_| {
                done += 1;
                info!(done, total, "Evaluating threat scores");
            })
            .try_collect()
            .await?;

        Ok(ThreatScores { threat_scores })
    }

    /// Accumulate every well-formed expert line of `text`
    pub fn parse(&self, text: &str) -> ThreatScore {
        let mut score = ThreatScore::empty();
        for caps in self.expert_line.captures_iter(text) {
            for category in ThreatCategory::ALL {
                if let Some(value) = caps
                    .name(category.as_str())
                    .and_then(|m| m.as_str().parse::<f64>().ok())
                {
                    score.push(category, value);
                }
            }
        }
        score
    }
}

fn threat_prompt(label: &str) -> String {
    format!(
        "Imagine a panel of ten experts in the research axis '{label}', each evaluating how directly \
         their research axis contributes to mitigating bioterrorist threats on a scale from 0 to 1, \
         where 0 indicates no direct contribution and 1 indicates a direct and substantial \
         contribution to reducing the threat.\n\n\
         Research Axis: '{label}'\n\n\
         Each expert provides a score answering the question: \"How directly does your research \
         axis contribute to reducing the bioterrorist threat of type [type]?\"\n\n\
         Please provide five scores for each expert, corresponding to the following threat types:\n\
         1. Viral Threats\n\
         2. Bacterial Threats\n\
         3. Toxin-Based Threats\n\
         4. Fungal Threats\n\
         5. Prion-Based Threats\n\n\
         Format the response exactly as follows:\n\
         Expert 1: Viral - X, Bacterial - X, Toxin - X, Fungal - X, Prion - X\n\
         Expert 2: Viral - X, Bacterial - X, Toxin - X, Fungal - X, Prion - X\n\
         ...\n\
         Expert 10: Viral - X, Bacterial - X, Toxin - X, Fungal - X, Prion - X"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedGenerator;

    fn scorer(generator: ScriptedGenerator) -> ThreatScorer {
        ThreatScorer::new(Arc::new(generator), "threat-model").unwrap()
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let text = "Expert 1: Viral - 0.9, Bacterial - 0.2, Toxin - 0.1, Fungal - 0.0, Prion - 0.05\n\
                    Expert 2: Viral - high, Bacterial - 0.2, Toxin - 0.1, Fungal - 0.0, Prion - 0.05\n\
                    Some commentary\n\
                    Expert 3: Viral - 0.8, Bacterial - 0.3, Toxin - 0.2, Fungal - 0.1, Prion - 0.0";
        let score = scorer(ScriptedGenerator::new(|_| None)).parse(text);
        assert_eq!(score.values(ThreatCategory::Viral), &[0.9, 0.8]);
        assert_eq!(score.values(ThreatCategory::Prion), &[0.05, 0.0]);
        assert_eq!(score.panel_size(), 2);
    }

    #[test]
    fn test_integer_scores_do_not_match() {
        let text = "Expert 1: Viral - 1, Bacterial - 0, Toxin - 0, Fungal - 0, Prion - 0";
        let score = scorer(ScriptedGenerator::new(|_| None)).parse(text);
        assert!(score.values(ThreatCategory::Viral).is_empty());
    }

    #[tokio::test]
    async fn test_score_sends_panel_prompt() {
        let generator = ScriptedGenerator::constant(
            "Expert 1: Viral - 0.7, Bacterial - 0.6, Toxin - 0.5, Fungal - 0.4, Prion - 0.3",
        );
        let score = scorer(generator.clone()).score("Smallpox Vaccine Research").await.unwrap();

        assert_eq!(score.values(ThreatCategory::Fungal), &[0.4]);
        let request = &generator.requests()[0];
        assert!(request.prompt.contains("'Smallpox Vaccine Research'"));
        assert_eq!(request.stop, vec!["\n\n".to_string()]);
        assert_eq!(request.temperature, 0.0);
    }

    #[tokio::test]
    async fn test_score_all_keeps_cluster_order() {
        use crate::models::Cluster;

        let generator = ScriptedGenerator::new(|req| {
            let value = if req.prompt.contains("'Ricin'") { "0.9" } else { "0.1" };
            Some(format!(
                "Expert 1: Viral - {v}, Bacterial - {v}, Toxin - {v}, Fungal - {v}, Prion - {v}",
                v = value
            ))
        });

        let mut clusters = Clusters::default();
        for (id, name) in [(3, "Ricin"), (-1, "Noise"), (0, "Vaccines")] {
            let mut cluster = Cluster::new(id, Vec::new());
            cluster.name = name.to_string();
            clusters.clusters.insert(id, cluster);
        }

        let scores = scorer(generator.clone()).score_all(&clusters, 3).await.unwrap();
        assert_eq!(scores.threat_scores.keys().copied().collect::<Vec<_>>(), vec![3, -1, 0]);
        assert_eq!(scores.threat_scores[&3].values(ThreatCategory::Toxin), &[0.9]);
        assert_eq!(scores.threat_scores[&0].values(ThreatCategory::Toxin), &[0.1]);
        assert_eq!(generator.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_response_gives_empty_sequences() {
        let score = scorer(ScriptedGenerator::new(|_| None))
            .score("Anything")
            .await
            .unwrap();
        assert_eq!(score, ThreatScore::empty());
    }
}
