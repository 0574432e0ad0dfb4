//! Language detection

use tracing::trace;

/// Decides whether a text is written in a given language
pub trait LanguageDetector: Send + Sync {
    /// `language` is an ISO 639-3 code such as `eng`
    fn is_in_language(&self, text: &str, language: &str) -> bool;
}

/// Trigram detector backed by `whatlang`
///
/// A text counts as being in the language only when it is non-blank, the
/// detected language matches and the detection is confident enough. Any
/// detection failure reads as "not in the language".
#[derive(Debug, Clone)]
pub struct WhatlangDetector {
    min_confidence: f64,
}

impl WhatlangDetector {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }
}

impl Default for WhatlangDetector {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl LanguageDetector for WhatlangDetector {
    fn is_in_language(&self, text: &str, language: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let Some(target) = whatlang::Lang::from_code(language) else {
            return false;
        };
        match whatlang::detect(text) {
            Some(info) => {
                trace!(lang = info.lang().code(), confidence = info.confidence(), "Language detected");
                info.lang() == target && info.confidence() >= self.min_confidence
            }
            None => false,
        }
    }
}
