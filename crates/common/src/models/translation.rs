//! Titles and abstracts in the target language

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::PaperId;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Translations {
    pub translations: IndexMap<PaperId, Translation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub title: String,
}

impl Translations {
    pub fn get(&self, paper_id: &str) -> Option<&Translation> {
        self.translations.get(paper_id)
    }

    pub fn contains(&self, paper_id: &str) -> bool {
        self.translations.contains_key(paper_id)
    }

    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }
}
