//! Biblio Common Library
//!
//! Shared code for every pipeline stage including:
//! - Paper, citation, cluster and threat-score models
//! - JSON artifact persistence and the reference cache
//! - Error types and handling
//! - Configuration management
//! - Clients for the bibliographic API, embeddings and chat completions
//! - Prompt-driven operations (translation, cluster labeling, threat scoring)

pub mod artifacts;
pub mod cache;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod errors;
pub mod lang;
pub mod llm;
pub mod models;
pub mod scholar;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use llm::TextGenerator;
pub use models::{ClusterId, PaperId, NOISE_CLUSTER};
pub use scholar::BibliographicSource;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
