//! Per-cluster threat judgments

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ClusterId;

/// Threat types judged by the expert panel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatCategory {
    Viral,
    Bacterial,
    Toxin,
    Fungal,
    Prion,
}

impl ThreatCategory {
    /// Every category, in prompt order
    pub const ALL: [ThreatCategory; 5] = [
        ThreatCategory::Viral,
        ThreatCategory::Bacterial,
        ThreatCategory::Toxin,
        ThreatCategory::Fungal,
        ThreatCategory::Prion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatCategory::Viral => "viral",
            ThreatCategory::Bacterial => "bacterial",
            ThreatCategory::Toxin => "toxin",
            ThreatCategory::Fungal => "fungal",
            ThreatCategory::Prion => "prion",
        }
    }
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreatScores {
    pub threat_scores: IndexMap<ClusterId, ThreatScore>,
}

/// Independent judgments per category
///
/// A category's sequence holds one value per successfully parsed expert line,
/// so it may be shorter than the panel or empty. Empty is not the same as zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreatScore(IndexMap<ThreatCategory, Vec<f64>>);

impl ThreatScore {
    /// Score with an empty sequence for every category
    pub fn empty() -> Self {
        Self(ThreatCategory::ALL.iter().map(|c| (*c, Vec::new())).collect())
    }

    pub fn push(&mut self, category: ThreatCategory, value: f64) {
        self.0.entry(category).or_default().push(value);
    }

    /// Judgments for one category (empty when never parsed)
    pub fn values(&self, category: ThreatCategory) -> &[f64] {
        self.0.get(&category).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ThreatCategory, &Vec<f64>)> {
        self.0.iter()
    }

    /// Number of complete expert lines parsed
    pub fn panel_size(&self) -> usize {
        self.0.values().map(|v| v.len()).min().unwrap_or(0)
    }
}

impl Default for ThreatScore {
    fn default() -> Self {
        Self::empty()
    }
}

impl ThreatScores {
    pub fn get(&self, cluster: ClusterId) -> Option<&ThreatScore> {
        self.threat_scores.get(&cluster)
    }
}
