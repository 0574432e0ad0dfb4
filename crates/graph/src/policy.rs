//! Pluggable strategies for graph construction
//!
//! Retention decides whether a cluster pair is drawn, width decides how thick
//! it is drawn, and the palette maps threat categories to node colors. Plain
//! closures implement the first two traits.

use indexmap::IndexMap;
use std::collections::HashSet;

use biblio_common::config::GraphConfig;
use biblio_common::models::{Citation, ThreatCategory};

/// Whether a cluster pair is significant enough to render
pub trait RetentionPolicy: Send + Sync {
    fn retain(&self, citations: &[Citation]) -> bool;
}

impl<F> RetentionPolicy for F
where
    F: Fn(&[Citation]) -> bool + Send + Sync,
{
    fn retain(&self, citations: &[Citation]) -> bool {
        self(citations)
    }
}

/// Line thickness of a retained cluster pair
pub trait WidthPolicy: Send + Sync {
    fn width(&self, citations: &[Citation]) -> f64;
}

impl<F> WidthPolicy for F
where
    F: Fn(&[Citation]) -> f64 + Send + Sync,
{
    fn width(&self, citations: &[Citation]) -> f64 {
        self(citations)
    }
}

/// Number of distinct cited papers
pub fn distinct_targets(citations: &[Citation]) -> usize {
    citations
        .iter()
        .map(|c| c.cited.as_str())
        .collect::<HashSet<_>>()
        .len()
}

pub fn any_influential(citations: &[Citation]) -> bool {
    citations.iter().any(|c| c.is_influential)
}

/// Keep a pair with an influential citation or enough distinct cited papers
#[derive(Debug, Clone, Copy)]
pub struct InfluenceOrBreadth {
    pub min_distinct_targets: usize,
}

impl Default for InfluenceOrBreadth {
    fn default() -> Self {
        Self {
            min_distinct_targets: 3,
        }
    }
}

impl RetentionPolicy for InfluenceOrBreadth {
    fn retain(&self, citations: &[Citation]) -> bool {
        any_influential(citations) || distinct_targets(citations) >= self.min_distinct_targets
    }
}

/// Maximum width for influential pairs, half the clamped breadth otherwise
#[derive(Debug, Clone, Copy)]
pub struct ClampedTargetWidth {
    pub max_width: f64,
}

impl Default for ClampedTargetWidth {
    fn default() -> Self {
        Self { max_width: 8.0 }
    }
}

impl WidthPolicy for ClampedTargetWidth {
    fn width(&self, citations: &[Citation]) -> f64 {
        if any_influential(citations) {
            self.max_width
        } else {
            (distinct_targets(citations) as f64).min(self.max_width) / 2.0
        }
    }
}

impl From<&GraphConfig> for InfluenceOrBreadth {
    fn from(config: &GraphConfig) -> Self {
        Self {
            min_distinct_targets: config.min_distinct_targets,
        }
    }
}

impl From<&GraphConfig> for ClampedTargetWidth {
    fn from(config: &GraphConfig) -> Self {
        Self {
            max_width: config.max_width,
        }
    }
}

/// Node color per threat category, iterated in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: IndexMap<ThreatCategory, String>,
}

impl Palette {
    pub fn empty() -> Self {
        Self {
            colors: IndexMap::new(),
        }
    }

    /// Add or recolor a category
    pub fn with(mut self, category: ThreatCategory, color: impl Into<String>) -> Self {
        self.colors.insert(category, color.into());
        self
    }

    pub fn color(&self, category: ThreatCategory) -> Option<&str> {
        self.colors.get(&category).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ThreatCategory, &str)> {
        self.colors.iter().map(|(c, color)| (*c, color.as_str()))
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::empty()
            .with(ThreatCategory::Viral, "red")
            .with(ThreatCategory::Bacterial, "green")
            .with(ThreatCategory::Toxin, "blue")
            .with(ThreatCategory::Fungal, "yellow")
            .with(ThreatCategory::Prion, "purple")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cite(cited: &str, influential: bool) -> Citation {
        Citation {
            citing: "src".to_string(),
            cited: cited.to_string(),
            intents: Vec::new(),
            is_influential: influential,
        }
    }

    #[test]
    fn test_default_retention() {
        let keep = InfluenceOrBreadth::default();
        assert!(!keep.retain(&[]));
        assert!(!keep.retain(&[cite("d", false)]));
        assert!(keep.retain(&[cite("d", false), cite("e", false), cite("f", false)]));
        assert!(keep.retain(&[cite("d", true)]));
    }

    #[test]
    fn test_repeated_targets_count_once() {
        let keep = InfluenceOrBreadth::default();
        assert!(!keep.retain(&[cite("d", false), cite("d", false), cite("e", false)]));
    }

    #[test]
    fn test_default_width() {
        let width = ClampedTargetWidth::default();
        assert_eq!(width.width(&[cite("d", true)]), 8.0);
        assert_eq!(width.width(&[cite("d", false), cite("e", false), cite("f", false)]), 1.5);

        let many: Vec<_> = (0..12).map(|i| cite(&i.to_string(), false)).collect();
        assert_eq!(width.width(&many), 4.0);
    }

    #[test]
    fn test_closures_are_policies() {
        let everything = |_: &[Citation]| true;
        let count = |c: &[Citation]| c.len() as f64;
        assert!(everything.retain(&[]));
        assert_eq!(count.width(&[cite("d", false), cite("d", false)]), 2.0);
    }

    #[test]
    fn test_default_palette_order() {
        let palette = Palette::default();
        let colors: Vec<_> = palette.iter().map(|(_, c)| c).collect();
        assert_eq!(colors, vec!["red", "green", "blue", "yellow", "purple"]);
        assert_eq!(palette.color(ThreatCategory::Toxin), Some("blue"));
    }
}
