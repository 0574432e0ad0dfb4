//! Service handles shared by the stages of one invocation
//!
//! Clients are built on first use, once per process, so a stage never needs
//! credentials of a service it does not call.

use std::sync::{Arc, OnceLock};

use biblio_common::embeddings::create_embedder;
use biblio_common::llm::OpenAIChat;
use biblio_common::scholar::SemanticScholarClient;
use biblio_common::{AppConfig, Embedder, Result, TextGenerator};

pub struct Services {
    pub config: AppConfig,
    scholar: OnceLock<Arc<SemanticScholarClient>>,
    generator: OnceLock<Arc<dyn TextGenerator>>,
    embedder: OnceLock<Arc<dyn Embedder>>,
}

impl Services {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            scholar: OnceLock::new(),
            generator: OnceLock::new(),
            embedder: OnceLock::new(),
        }
    }

    pub fn scholar(&self) -> Result<Arc<SemanticScholarClient>> {
        if let Some(client) = self.scholar.get() {
            return Ok(client.clone());
        }
        let client = Arc::new(SemanticScholarClient::new(&self.config.scholar)?);
        Ok(self.scholar.get_or_init(|| client).clone())
    }

    pub fn generator(&self) -> Result<Arc<dyn TextGenerator>> {
        if let Some(generator) = self.generator.get() {
            return Ok(generator.clone());
        }
        let generator: Arc<dyn TextGenerator> = Arc::new(OpenAIChat::from_config(&self.config.llm)?);
        Ok(self.generator.get_or_init(|| generator).clone())
    }

    pub fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        if let Some(embedder) = self.embedder.get() {
            return Ok(embedder.clone());
        }
        let embedder = create_embedder(&self.config.embedding)?;
        Ok(self.embedder.get_or_init(|| embedder).clone())
    }
}
