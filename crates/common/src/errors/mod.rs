//! Error types for Biblio pipeline stages
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - Process exit code mapping
//! - Error codes for machine-readable reporting

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidFormat,

    // Missing data (4xxx)
    MissingField,
    MissingLabel,
    ArtifactNotFound,

    // External service errors (8xxx)
    UpstreamError,
    EmptyCompletion,
    EmbeddingError,
    CacheError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
    RenderError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidFormat => 1003,

            // Missing data (4xxx)
            ErrorCode::MissingField => 4001,
            ErrorCode::MissingLabel => 4002,
            ErrorCode::ArtifactNotFound => 4003,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::EmbeddingError => 8002,
            ErrorCode::EmptyCompletion => 8003,
            ErrorCode::CacheError => 8006,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::RenderError => 9004,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>
    },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Missing-data precondition violations
    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("No generated label for cluster {cluster}")]
    MissingLabel { cluster: i32 },

    #[error("Artifact not found: {path}")]
    ArtifactNotFound { path: String },

    // External service errors
    #[error("Upstream API error {status} from {service}: {message}")]
    UpstreamStatus {
        service: String,
        status: u16,
        message: String
    },

    #[error("Empty completion from text service: {purpose}")]
    EmptyCompletion { purpose: String },

    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Cache error: {message}")]
    CacheError { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render error: {message}")]
    Render { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::MissingLabel { .. } => ErrorCode::MissingLabel,
            AppError::ArtifactNotFound { .. } => ErrorCode::ArtifactNotFound,
            AppError::UpstreamStatus { .. } => ErrorCode::UpstreamError,
            AppError::EmptyCompletion { .. } => ErrorCode::EmptyCompletion,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::CacheError { .. } => ErrorCode::CacheError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Io(_) => ErrorCode::InternalError,
            AppError::Render { .. } => ErrorCode::RenderError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.code().as_code() / 1000 {
            1 => 2,
            4 => 3,
            8 => 4,
            _ => 1,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string()
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|k| k.to_string());
        AppError::Validation {
            message: err.to_string(),
            field,
        }
    }
}
