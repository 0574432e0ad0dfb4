//! Paper snapshot as returned by the bibliographic API

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::PaperId;

/// Field names requested from the search endpoint
pub const PAPER_FIELDS: &[&str] = &[
    "paperId",
    "abstract",
    "title",
    "referenceCount",
    "citationCount",
    "influentialCitationCount",
    "fieldsOfStudy",
    "s2FieldsOfStudy",
    "publicationTypes",
    "journal",
];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Papers {
    pub papers: IndexMap<PaperId, Paper>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub paper_id: PaperId,

    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    pub title: String,

    #[serde(default)]
    pub reference_count: u32,

    #[serde(default)]
    pub citation_count: u32,

    #[serde(default)]
    pub influential_citation_count: u32,

    pub fields_of_study: Option<Vec<String>>,

    #[serde(rename = "s2FieldsOfStudy", default)]
    pub s2_fields_of_study: Vec<FieldOfStudy>,

    pub publication_types: Option<Vec<String>>,

    pub journal: Option<Journal>,
}

/// Field of study with the classifier that produced it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOfStudy {
    pub category: String,
    pub source: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
}

impl Papers {
    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn contains(&self, paper_id: &str) -> bool {
        self.papers.contains_key(paper_id)
    }

    /// Papers carrying a non-empty abstract, in snapshot order
    pub fn with_abstract(&self) -> impl Iterator<Item = (&PaperId, &Paper)> {
        self.papers
            .iter()
            .filter(|(_, paper)| paper.abstract_text.as_deref().is_some_and(|a| !a.is_empty()))
    }
}

impl Paper {
    /// Minimal paper, used by tests and offline fixtures
    pub fn new(paper_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            paper_id: paper_id.into(),
            abstract_text: None,
            title: title.into(),
            reference_count: 0,
            citation_count: 0,
            influential_citation_count: 0,
            fields_of_study: None,
            s2_fields_of_study: Vec::new(),
            publication_types: None,
            journal: None,
        }
    }

    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = Some(text.into());
        self
    }
}

impl FromIterator<Paper> for Papers {
    /// Keeps the first occurrence of a duplicated id
    fn from_iter<I: IntoIterator<Item = Paper>>(iter: I) -> Self {
        let mut papers = IndexMap::new();
        for paper in iter {
            papers.entry(paper.paper_id.clone()).or_insert(paper);
        }
        Self { papers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_payload_parses() {
        let json = r#"{
            "paperId": "p1",
            "abstract": null,
            "title": "Anthrax detection",
            "referenceCount": 12,
            "citationCount": 40,
            "influentialCitationCount": 3,
            "fieldsOfStudy": ["Medicine"],
            "s2FieldsOfStudy": [{"category": "Medicine", "source": "external"}],
            "publicationTypes": null,
            "journal": {"name": "Lancet"}
        }"#;
        let paper: Paper = serde_json::from_str(json).unwrap();
        assert_eq!(paper.paper_id, "p1");
        assert!(paper.abstract_text.is_none());
        assert_eq!(paper.journal.unwrap().volume, None);
        assert_eq!(paper.s2_fields_of_study[0].category, "Medicine");
    }

    #[test]
    fn test_snapshot_round_trip_keeps_order() {
        let papers: Papers = vec![
            Paper::new("z", "Last alphabetically").with_abstract("a"),
            Paper::new("a", "First alphabetically"),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string_pretty(&papers).unwrap();
        let parsed: Papers = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, papers);
        assert_eq!(parsed.papers.keys().collect::<Vec<_>>(), vec!["z", "a"]);
        assert!(json.contains("\"abstract\": \"a\""));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let papers: Papers = vec![Paper::new("a", "one"), Paper::new("a", "two")]
            .into_iter()
            .collect();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers.papers["a"].title, "one");
    }
}
