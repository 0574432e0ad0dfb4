//! JSON artifact persistence
//!
//! Stages exchange data only through files in the data folder. Artifacts are
//! written pretty-printed and read back into the same envelope types.

use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tracing::debug;

use crate::errors::{AppError, Result};

/// Read a JSON artifact
///
/// A missing file is reported as `ArtifactNotFound` so callers can tell an
/// unrun upstream stage apart from a corrupt file.
pub async fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::ArtifactNotFound {
                path: path.display().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    let value = serde_json::from_slice(&bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Artifact loaded");
    Ok(value)
}

/// Read a JSON artifact, or `None` when the file does not exist
pub async fn read_json_opt<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Option<T>> {
    match read_json(path).await {
        Ok(value) => Ok(Some(value)),
        Err(AppError::ArtifactNotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write a JSON artifact, creating the parent folder when needed
pub async fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path).await?;
    let json = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, &json).await?;
    debug!(path = %path.display(), bytes = json.len(), "Artifact written");
    Ok(())
}

/// Write a text artifact (HTML, DOT)
pub async fn write_text(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path).await?;
    tokio::fs::write(path, contents).await?;
    Ok(())
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Paper, Papers};

    #[tokio::test]
    async fn test_round_trip_creates_folders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("papers.json");

        let papers: Papers = vec![Paper::new("p1", "First"), Paper::new("p2", "Second")]
            .into_iter()
            .collect();
        write_json(&path, &papers).await.unwrap();

        let loaded: Papers = read_json(&path).await.unwrap();
        assert_eq!(loaded, papers);
        assert_eq!(loaded.papers.keys().collect::<Vec<_>>(), vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clusters.json");

        let err = read_json::<Papers>(&path).await.unwrap_err();
        assert!(matches!(err, AppError::ArtifactNotFound { .. }));
        assert!(read_json_opt::<Papers>(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_artifact_is_not_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let err = read_json_opt::<Papers>(&path).await.unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
