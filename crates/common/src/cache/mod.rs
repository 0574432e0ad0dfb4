//! Disk cache for the reference fetching stage
//!
//! Provides:
//! - Content-addressed cache file per papers snapshot
//! - Resume of a partially completed fetch
//! - Incremental rewrite after every fetched paper

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::artifacts;
use crate::errors::{AppError, Result};
use crate::models::{Papers, ReferencesByPaper};

/// Reference cache bound to one papers snapshot
#[derive(Debug, Clone)]
pub struct DiskCache {
    path: PathBuf,
    enabled: bool,
}

impl DiskCache {
    /// Create the cache for `papers` inside `folder`
    ///
    /// With `enabled == false` nothing is read back, but progress is still
    /// persisted so that a later cached run can resume from it.
    pub fn for_papers(folder: impl AsRef<Path>, papers: &Papers, enabled: bool) -> Result<Self> {
        let key = snapshot_key(papers)?;
        Ok(Self {
            path: folder.as_ref().join(key),
            enabled,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load previously fetched references
    ///
    /// A disabled cache or a missing file yields an empty starting point.
    pub async fn load(&self) -> Result<ReferencesByPaper> {
        if !self.enabled {
            debug!(path = %self.path.display(), "Reference cache disabled");
            return Ok(ReferencesByPaper::default());
        }

        match artifacts::read_json_opt::<ReferencesByPaper>(&self.path).await {
            Ok(Some(cached)) => {
                info!(path = %self.path.display(), papers = cached.len(), "Reference cache hit");
                Ok(cached)
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "Reference cache miss");
                Ok(ReferencesByPaper::default())
            }
            Err(e) => Err(AppError::CacheError {
                message: format!("Failed to read cache '{}': {}", self.path.display(), e),
            }),
        }
    }

    /// Rewrite the whole cache file
    pub async fn store(&self, references: &ReferencesByPaper) -> Result<()> {
        artifacts::write_json(&self.path, references)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to write cache '{}': {}", self.path.display(), e),
            })
    }
}

/// Hex SHA-256 of the compact JSON form of a snapshot
pub fn snapshot_key(papers: &Papers) -> Result<String> {
    let json = serde_json::to_vec(papers)?;
    let mut hasher = Sha256::new();
    hasher.update(&json);
    Ok(hex::encode(hasher.finalize()))
}
