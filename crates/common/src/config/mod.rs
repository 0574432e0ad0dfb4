//! Configuration management for Biblio pipeline stages
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Legacy variables (DATA_PATH, SEMANTIC_SCHOLAR_API_KEY, OPENAI_API_KEY)
//! - Default values

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::errors::Result;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Artifact locations
    #[serde(default)]
    pub data: DataConfig,

    /// Bibliographic API client configuration
    #[serde(default)]
    pub scholar: ScholarConfig,

    /// Chat completion configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Projection and density clustering parameters
    #[serde(default)]
    pub clustering: ClusteringConfig,

    /// Language detection and translation
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Cluster graph construction and rendering
    #[serde(default)]
    pub graph: GraphConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Folder holding every artifact
    #[serde(default = "default_data_folder")]
    pub folder: PathBuf,

    /// Folder for the reference cache (falls back to the data folder)
    pub cache_folder: Option<PathBuf>,

    #[serde(default = "default_papers_file")]
    pub papers: String,

    #[serde(default = "default_translations_file")]
    pub translations: String,

    #[serde(default = "default_references_file")]
    pub references: String,

    #[serde(default = "default_clusters_file")]
    pub clusters: String,

    #[serde(default = "default_clusters_html_file")]
    pub clusters_html: String,

    #[serde(default = "default_threat_scores_file")]
    pub threat_scores: String,

    #[serde(default = "default_graph_file")]
    pub graph: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ScholarConfig {
    /// Graph API base URL
    #[serde(default = "default_scholar_base_url")]
    pub base_url: String,

    /// API key sent as `x-api-key`
    pub api_key: Option<String>,

    /// Page size for reference listings
    #[serde(default = "default_scholar_page_size")]
    #[validate(range(min = 1, max = 1000))]
    pub page_size: usize,

    /// Client-side request rate
    #[serde(default = "default_scholar_rps")]
    #[validate(range(min = 1))]
    pub requests_per_second: u32,

    /// Give up retrying transient failures after this many seconds
    #[serde(default = "default_scholar_retry_secs")]
    pub max_retry_secs: u64,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LlmConfig {
    /// Chat completions endpoint
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// API key for the completion service
    pub api_key: Option<String>,

    /// Model used for cluster titles
    #[serde(default = "default_label_model")]
    pub label_model: String,

    /// Model used for the expert panel
    #[serde(default = "default_threat_model")]
    pub threat_model: String,

    /// Model used for translations
    #[serde(default = "default_translation_model")]
    pub translation_model: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Maximum in-flight completions per stage
    #[serde(default = "default_llm_concurrency")]
    #[validate(range(min = 1, max = 64))]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1, max = 2048))]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ClusteringConfig {
    /// Dimensionality of the projection
    #[serde(default = "default_n_dims")]
    #[validate(range(min = 1, max = 16))]
    pub n_dims: usize,

    /// Smallest group of papers that forms a cluster
    #[serde(default = "default_min_cluster_size")]
    #[validate(range(min = 2))]
    pub min_cluster_size: usize,

    /// Neighbourhood size for core distances
    #[serde(default = "default_min_samples")]
    #[validate(range(min = 1))]
    pub min_samples: usize,

    #[serde(default = "default_perplexity")]
    #[validate(range(min = 1.0))]
    pub perplexity: f64,

    #[serde(default = "default_iterations")]
    #[validate(range(min = 250))]
    pub iterations: usize,

    /// Seed of the projection's initial layout
    #[serde(default)]
    pub seed: u64,

    /// Titles shown to the labeling prompt per cluster
    #[serde(default = "default_title_sample_limit")]
    #[validate(range(min = 1))]
    pub title_sample_limit: usize,

    /// Local plotly.min.js embedded in the interactive page (CDN when unset)
    pub plotly_js: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct TranslationConfig {
    /// ISO 639-3 code of the target language
    #[serde(default = "default_target_language")]
    #[validate(length(equal = 3))]
    pub target_language: String,

    /// Detection confidence required to skip translation
    #[serde(default = "default_min_confidence")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_confidence: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct GraphConfig {
    /// Median score a category must exceed to color a node
    #[serde(default = "default_score_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub score_threshold: f64,

    /// Drop clusters without any retained edge
    #[serde(default = "default_enabled")]
    pub remove_isolated: bool,

    /// Layout weight multiplier (None keeps every weight at 1.0)
    #[serde(default = "default_influence_weight")]
    #[validate(range(min = 0.0))]
    pub influence_weight: Option<f64>,

    /// Column width of wrapped node labels
    #[serde(default = "default_wrap_width")]
    #[validate(range(min = 1))]
    pub wrap_width: usize,

    /// Pen width of influential edges and cap of the others
    #[serde(default = "default_max_width")]
    #[validate(range(min = 1.0))]
    pub max_width: f64,

    /// Distinct cited papers needed to keep a non-influential edge
    #[serde(default = "default_min_distinct_targets")]
    #[validate(range(min = 1))]
    pub min_distinct_targets: usize,

    /// Graphviz layout program
    #[serde(default = "default_layout_program")]
    pub layout_program: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,
}

// Default value functions
fn default_data_folder() -> PathBuf {
    std::env::var("DATA_PATH").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("data"))
}
fn default_papers_file() -> String { "papers.json".to_string() }
fn default_translations_file() -> String { "translations.json".to_string() }
fn default_references_file() -> String { "references.json".to_string() }
fn default_clusters_file() -> String { "clusters.json".to_string() }
fn default_clusters_html_file() -> String { "clusters.html".to_string() }
fn default_threat_scores_file() -> String { "threat_scores.json".to_string() }
fn default_graph_file() -> String { "graph.png".to_string() }
fn default_scholar_base_url() -> String { "https://api.semanticscholar.org/graph/v1".to_string() }
fn default_scholar_page_size() -> usize { 100 }
fn default_scholar_rps() -> u32 { 1 }
fn default_scholar_retry_secs() -> u64 { 120 }
fn default_request_timeout() -> u64 { 30 }
fn default_llm_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_label_model() -> String { "gpt-3.5-turbo".to_string() }
fn default_threat_model() -> String { "gpt-4-turbo".to_string() }
fn default_translation_model() -> String { "gpt-3.5-turbo".to_string() }
fn default_llm_timeout() -> u64 { 60 }
fn default_llm_concurrency() -> usize { 1 }
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_batch_size() -> usize { 100 }
fn default_n_dims() -> usize { 3 }
fn default_min_cluster_size() -> usize { 10 }
fn default_min_samples() -> usize { 7 }
fn default_perplexity() -> f64 { 30.0 }
fn default_iterations() -> usize { 1000 }
fn default_title_sample_limit() -> usize { 20 }
fn default_target_language() -> String { "eng".to_string() }
fn default_min_confidence() -> f64 { 0.9 }
fn default_score_threshold() -> f64 { 0.75 }
fn default_enabled() -> bool { true }
fn default_influence_weight() -> Option<f64> { Some(1.0 / 8.0) }
fn default_wrap_width() -> usize { 20 }
fn default_max_width() -> f64 { 8.0 }
fn default_min_distinct_targets() -> usize { 3 }
fn default_layout_program() -> String { "dot".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        dotenvy::from_filename(".env.local").ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__GRAPH__SCORE_THRESHOLD=0.8
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        Self::finish(config)
    }

    /// Load from a specific configuration file
    pub fn from_file(path: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self> {
        let mut cfg: AppConfig = config.try_deserialize()?;
        cfg.apply_legacy_env();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Fill credentials from the variable names used by earlier deployments
    fn apply_legacy_env(&mut self) {
        if self.scholar.api_key.is_none() {
            self.scholar.api_key = std::env::var("SEMANTIC_SCHOLAR_API_KEY").ok();
        }
        if self.llm.api_key.is_none() {
            self.llm.api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if self.embedding.api_key.is_none() {
            self.embedding.api_key = self.llm.api_key.clone();
        }
    }

    /// Validate every numeric section
    pub fn validate(&self) -> Result<()> {
        self.scholar.validate()?;
        self.llm.validate()?;
        self.embedding.validate()?;
        self.clustering.validate()?;
        self.translation.validate()?;
        self.graph.validate()?;
        Ok(())
    }

    /// Get the scholar request timeout as Duration
    pub fn scholar_timeout(&self) -> Duration {
        Duration::from_secs(self.scholar.timeout_secs)
    }

    /// Get the completion request timeout as Duration
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }
}

impl DataConfig {
    pub fn papers_path(&self) -> PathBuf { self.folder.join(&self.papers) }
    pub fn translations_path(&self) -> PathBuf { self.folder.join(&self.translations) }
    pub fn references_path(&self) -> PathBuf { self.folder.join(&self.references) }
    pub fn clusters_path(&self) -> PathBuf { self.folder.join(&self.clusters) }
    pub fn clusters_html_path(&self) -> PathBuf { self.folder.join(&self.clusters_html) }
    pub fn threat_scores_path(&self) -> PathBuf { self.folder.join(&self.threat_scores) }
    pub fn graph_path(&self) -> PathBuf { self.folder.join(&self.graph) }

    /// Get the cache folder (falls back to the data folder)
    pub fn cache_path(&self) -> PathBuf {
        self.cache_folder.clone().unwrap_or_else(|| self.folder.clone())
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            folder: default_data_folder(),
            cache_folder: None,
            papers: default_papers_file(),
            translations: default_translations_file(),
            references: default_references_file(),
            clusters: default_clusters_file(),
            clusters_html: default_clusters_html_file(),
            threat_scores: default_threat_scores_file(),
            graph: default_graph_file(),
        }
    }
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            base_url: default_scholar_base_url(),
            api_key: None,
            page_size: default_scholar_page_size(),
            requests_per_second: default_scholar_rps(),
            max_retry_secs: default_scholar_retry_secs(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: None,
            label_model: default_label_model(),
            threat_model: default_threat_model(),
            translation_model: default_translation_model(),
            timeout_secs: default_llm_timeout(),
            concurrency: default_llm_concurrency(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            n_dims: default_n_dims(),
            min_cluster_size: default_min_cluster_size(),
            min_samples: default_min_samples(),
            perplexity: default_perplexity(),
            iterations: default_iterations(),
            seed: 0,
            title_sample_limit: default_title_sample_limit(),
            plotly_js: None,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            target_language: default_target_language(),
            min_confidence: default_min_confidence(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            score_threshold: default_score_threshold(),
            remove_isolated: default_enabled(),
            influence_weight: default_influence_weight(),
            wrap_width: default_wrap_width(),
            max_width: default_max_width(),
            min_distinct_targets: default_min_distinct_targets(),
            layout_program: default_layout_program(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
        }
    }
}
