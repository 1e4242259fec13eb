use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use super::{classify_response, content_type_for, record_fetch, record_probe};
use super::{ArtifactPresence, ArtifactSource, ArtifactText};
use crate::error::{DashboardError, Result};

/// Artifacts exported to a local directory (the static host's public root).
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a root-relative location onto the directory. Parent components
    /// are refused so a location cannot escape the root.
    pub fn resolve(&self, location: &str) -> Result<PathBuf> {
        let rel = Path::new(location.trim_start_matches('/'));
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(DashboardError::InvalidLocation(location.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ArtifactSource for DirSource {
    async fn fetch(&self, location: &str) -> Result<ArtifactText> {
        let path = self.resolve(location)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let err = DashboardError::not_found(location, "no such file");
                return record_fetch(location, Err(err));
            }
            Err(e) => return record_fetch(location, Err(DashboardError::Io(e))),
        };
        // Invalid UTF-8 is replaced, matching how HTTP bodies are decoded.
        let body = String::from_utf8_lossy(&bytes).into_owned();
        record_fetch(
            location,
            classify_response(location, 200, content_type_for(location), body),
        )
    }

    async fn probe(&self, location: &str) -> Result<ArtifactPresence> {
        let path = self.resolve(location)?;
        let presence = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && content_type_for(location) != Some("text/html") => {
                ArtifactPresence::Present
            }
            Ok(_) => ArtifactPresence::Missing,
            Err(e) if e.kind() == ErrorKind::NotFound => ArtifactPresence::Missing,
            Err(e) => return Err(DashboardError::Io(e)),
        };
        Ok(record_probe(location, presence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_strips_leading_slash() {
        let src = DirSource::new("/srv/public");
        let path = src.resolve("/artifacts/sprint4/metrics.json").unwrap();
        assert_eq!(path, PathBuf::from("/srv/public/artifacts/sprint4/metrics.json"));
    }

    #[test]
    fn resolve_refuses_parent_components() {
        let src = DirSource::new("/srv/public");
        assert!(src.resolve("/artifacts/../../etc/passwd").is_err());
    }
}
