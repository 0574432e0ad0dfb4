//! Graph construction error types

use biblio_common::{AppError, ClusterId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("No generated label for cluster {cluster}")]
    MissingLabel { cluster: ClusterId },

    #[error("Median of an empty sample")]
    EmptySample,

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GraphError> for AppError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::MissingLabel { cluster } => AppError::MissingLabel { cluster },
            GraphError::EmptySample => AppError::Internal {
                message: e.to_string(),
            },
            GraphError::Render { message } => AppError::Render { message },
            GraphError::Io(err) => AppError::Io(err),
        }
    }
}
