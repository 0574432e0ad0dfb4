//! Outgoing references of a paper
//!
//! `Reference` mirrors the bibliographic API, where the cited paper may be
//! unresolved. `Citation` is the validated form used by aggregation: it only
//! exists when both endpoints are known.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use super::PaperId;

/// Field names requested from the references endpoint
pub const REFERENCE_FIELDS: &[&str] = &["intents", "isInfluential", "citedPaper.paperId"];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferencesByPaper {
    pub papers: IndexMap<PaperId, References>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct References {
    pub references: Vec<Reference>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(default)]
    pub paper_id: Option<PaperId>,

    #[serde(default)]
    pub cited_paper: PaperRef,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub intents: Vec<String>,

    #[serde(default)]
    pub is_influential: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRef {
    #[serde(default)]
    pub paper_id: Option<PaperId>,
}

/// A reference whose both endpoints are resolved paper ids
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub citing: PaperId,
    pub cited: PaperId,
    pub intents: Vec<String>,
    pub is_influential: bool,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Reference {
    pub fn cited_id(&self) -> Option<&str> {
        self.cited_paper.paper_id.as_deref()
    }

    /// Resolve into a citation from `citing`
    ///
    /// `None` when the cited paper is unresolved; such references never
    /// reach aggregation.
    pub fn resolve(&self, citing: &str) -> Option<Citation> {
        let cited = self.cited_id()?;
        Some(Citation {
            citing: citing.to_string(),
            cited: cited.to_string(),
            intents: self.intents.clone(),
            is_influential: self.is_influential,
        })
    }
}

impl ReferencesByPaper {
    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn contains(&self, paper_id: &str) -> bool {
        self.papers.contains_key(paper_id)
    }

    pub fn insert(&mut self, paper_id: PaperId, references: References) {
        self.papers.insert(paper_id, references);
    }

    /// Total number of stored references
    pub fn reference_count(&self) -> usize {
        self.papers.values().map(|r| r.references.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_intents_and_missing_cited_id() {
        let json = r#"{"citedPaper": {"paperId": null}, "intents": null, "isInfluential": true}"#;
        let reference: Reference = serde_json::from_str(json).unwrap();
        assert!(reference.intents.is_empty());
        assert!(reference.cited_id().is_none());
        assert!(reference.is_influential);

        assert_eq!(reference.resolve("p1"), None);
    }

    #[test]
    fn test_resolve_keeps_payload() {
        let reference = Reference {
            paper_id: None,
            cited_paper: PaperRef { paper_id: Some("p2".into()) },
            intents: vec!["methodology".into()],
            is_influential: false,
        };
        let citation = reference.resolve("p1").unwrap();
        assert_eq!(citation.citing, "p1");
        assert_eq!(citation.cited, "p2");
        assert_eq!(citation.intents, vec!["methodology".to_string()]);
    }

    #[test]
    fn test_round_trip() {
        let mut by_paper = ReferencesByPaper::default();
        by_paper.insert(
            "p1".into(),
            References {
                references: vec![Reference {
                    paper_id: None,
                    cited_paper: PaperRef { paper_id: Some("p2".into()) },
                    intents: vec!["background".into()],
                    is_influential: true,
                }],
            },
        );
        let json = serde_json::to_string(&by_paper).unwrap();
        assert!(json.contains("\"citedPaper\":{\"paperId\":\"p2\"}"));
        let parsed: ReferencesByPaper = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, by_paper);
        assert_eq!(parsed.reference_count(), 1);
    }
}
