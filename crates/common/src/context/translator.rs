//! Abstract and title translation

use futures::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::errors::{AppError, Result};
use crate::lang::LanguageDetector;
use crate::llm::{CompletionRequest, TextGenerator};
use crate::models::{Paper, Papers, Translation, Translations};

pub struct Translator {
    generator: Arc<dyn TextGenerator>,
    detector: Arc<dyn LanguageDetector>,
    model: String,
    /// ISO 639-3 code
    target_language: String,
}

impl Translator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        detector: Arc<dyn LanguageDetector>,
        model: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            detector,
            model: model.into(),
            target_language: target_language.into(),
        }
    }

    /// Translate one paper
    ///
    /// Returns `None` for papers without an abstract. An abstract already in
    /// the target language is passed through with its title untouched.
    #[instrument(skip(self, paper), fields(paper_id = %paper.paper_id))]
    pub async fn translate(&self, paper: &Paper) -> Result<Option<Translation>> {
        let Some(abstract_text) = paper.abstract_text.as_deref().filter(|a| !a.is_empty()) else {
            return Ok(None);
        };

        if self.detector.is_in_language(abstract_text, &self.target_language) {
            return Ok(Some(Translation {
                abstract_text: abstract_text.to_string(),
                title: paper.title.clone(),
            }));
        }

        let language = language_name(&self.target_language);
        let translated_abstract = self
            .complete(
                format!("Translate or extract an {language} version of this abstract : '{abstract_text}'"),
                "abstract",
                &paper.paper_id,
            )
            .await?;
        let translated_title = self
            .complete(
                format!("Translate this title in {language} : '{}'", paper.title),
                "title",
                &paper.paper_id,
            )
            .await?;

        debug!("Paper translated");
        Ok(Some(Translation {
            abstract_text: translated_abstract,
            title: translated_title,
        }))
    }

    /// Translate every paper with an abstract, keeping snapshot order
    ///
    /// Up to `concurrency` papers are in flight at once.
    pub async fn translate_all(&self, papers: &Papers, concurrency: usize) -> Result<Translations> {
        let total = papers.with_abstract().count();
        let mut done = 0usize;

        let results: Vec<(String, Option<Translation>)> = stream::iter(papers.with_abstract())
            .map(|(id, paper)| async move {
                let translation = self.translate(paper).await?;
                Ok::<_, AppError>((id.clone(), translation))
            })
            .buffered(concurrency.max(1))
            .inspect_ok(|_| {
                done += 1;
                if done % 50 == 0 || done == total {
                    info!(done, total, "Translating abstracts");
                }
            })
            .try_collect()
            .await?;

        let translations = results
            .into_iter()
            .filter_map(|(id, t)| t.map(|t| (id, t)))
            .collect();
        Ok(Translations { translations })
    }

    async fn complete(&self, prompt: String, part: &str, paper_id: &str) -> Result<String> {
        self.generator
            .complete(CompletionRequest::new(&self.model, prompt))
            .await?
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| AppError::EmptyCompletion {
                purpose: format!("{} translation of {}", part, paper_id),
            })
    }
}

/// English name of an ISO 639-3 code, or the code itself when unknown
fn language_name(code: &str) -> String {
    whatlang::Lang::from_code(code)
        .map(|lang| lang.eng_name().to_string())
        .unwrap_or_else(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedGenerator;

    struct FixedDetector(bool);

    impl LanguageDetector for FixedDetector {
        fn is_in_language(&self, _text: &str, _language: &str) -> bool {
            self.0
        }
    }

    fn translator(generator: ScriptedGenerator, in_language: bool) -> Translator {
        Translator::new(
            Arc::new(generator),
            Arc::new(FixedDetector(in_language)),
            "translation-model",
            "eng",
        )
    }

    #[tokio::test]
    async fn test_paper_without_abstract_is_skipped() {
        let generator = ScriptedGenerator::constant("x");
        let t = translator(generator.clone(), false);
        assert!(t.translate(&Paper::new("p1", "Titre")).await.unwrap().is_none());
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_target_language_passes_through() {
        let generator = ScriptedGenerator::constant("x");
        let t = translator(generator.clone(), true);
        let paper = Paper::new("p1", "Anthrax").with_abstract("An English abstract.");

        let translation = t.translate(&paper).await.unwrap().unwrap();
        assert_eq!(translation.abstract_text, "An English abstract.");
        assert_eq!(translation.title, "Anthrax");
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_abstract_translated_twice() {
        let generator = ScriptedGenerator::new(|req| {
            if req.prompt.starts_with("Translate this title") {
                Some("Anthrax detection".to_string())
            } else {
                Some("Translated abstract".to_string())
            }
        });
        let t = translator(generator.clone(), false);
        let paper = Paper::new("p1", "Détection du charbon").with_abstract("Un résumé.");

        let translation = t.translate(&paper).await.unwrap().unwrap();
        assert_eq!(translation.abstract_text, "Translated abstract");
        assert_eq!(translation.title, "Anthrax detection");

        let requests = generator.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].prompt.contains("English version of this abstract : 'Un résumé.'"));
        assert!(requests[1].prompt.contains("'Détection du charbon'"));
    }

    #[tokio::test]
    async fn test_empty_translation_is_fatal() {
        let t = translator(ScriptedGenerator::new(|_| None), false);
        let paper = Paper::new("p1", "Titre").with_abstract("Un résumé.");
        let err = t.translate(&paper).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyCompletion { .. }));
    }

    #[tokio::test]
    async fn test_translate_all_keeps_order() {
        let t = translator(ScriptedGenerator::constant("x"), true);
        let papers: Papers = vec![
            Paper::new("b", "B").with_abstract("second"),
            Paper::new("a", "A"),
            Paper::new("c", "C").with_abstract("third"),
        ]
        .into_iter()
        .collect();

        let translations = t.translate_all(&papers, 4).await.unwrap();
        assert_eq!(translations.translations.keys().collect::<Vec<_>>(), vec!["b", "c"]);
    }
}
