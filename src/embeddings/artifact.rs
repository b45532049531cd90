// aidcore/src/embeddings/artifact.rs
//
// Model artifact resolution
//
// A bundled artifact is used in place. A remote one is downloaded once into
// the cache directory and reused on every later load. Downloads land in a
// `.part` file first, so an interrupted fetch never looks like a valid cache.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::RetrievalError;

/// Artifact fetch and cache errors
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Invalid model location '{0}'")]
    InvalidLocation(String),
    #[error("Download failed: {0}")]
    Http(String),
    #[error("Cache I/O failed: {0}")]
    Io(String),
}

impl From<FetchError> for RetrievalError {
    fn from(e: FetchError) -> Self {
        RetrievalError::ArtifactUnresolvable(e.to_string())
    }
}

/// Where the encoder artifact lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelLocation {
    /// Shipped with the application, read in place
    Bundled(PathBuf),
    /// Only reachable over the network, materialized once
    Remote(Url),
}

impl ModelLocation {
    /// Parse a plain path, a `file://` URI or an `http(s)://` URL
    pub fn parse(location: &str) -> Result<Self, FetchError> {
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Err(FetchError::InvalidLocation(location.to_string()));
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(trimmed)
                .map_err(|e| FetchError::InvalidLocation(format!("{}: {}", trimmed, e)))?;
            return Ok(Self::Remote(url));
        }

        if lower.starts_with("file://") {
            let path = Url::parse(trimmed)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(|| FetchError::InvalidLocation(trimmed.to_string()))?;
            return Ok(Self::Bundled(path));
        }

        Ok(Self::Bundled(PathBuf::from(trimmed)))
    }
}

/// Downloads remote artifacts.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// `reqwest`-backed fetcher
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::Http(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Resolves the configured location to a local, randomly-accessible file.
pub struct ArtifactResolver {
    location: ModelLocation,
    cache_dir: PathBuf,
    fetcher: Arc<dyn ArtifactFetcher>,
}

impl ArtifactResolver {
    pub fn new(
        location: ModelLocation,
        cache_dir: impl Into<PathBuf>,
        fetcher: Arc<dyn ArtifactFetcher>,
    ) -> Self {
        Self {
            location,
            cache_dir: cache_dir.into(),
            fetcher,
        }
    }

    pub fn location(&self) -> &ModelLocation {
        &self.location
    }

    /// Local file a remote artifact is cached under; `None` for bundled ones
    pub fn cached_path(&self) -> Option<PathBuf> {
        match &self.location {
            ModelLocation::Bundled(_) => None,
            ModelLocation::Remote(url) => {
                let file_name = url
                    .path_segments()
                    .and_then(|segments| segments.last())
                    .filter(|name| !name.is_empty())
                    .unwrap_or("model.onnx");
                Some(self.cache_dir.join(file_name))
            }
        }
    }

    /// Resolve to a local path, downloading at most once.
    #[instrument(skip_all)]
    pub async fn resolve(&self) -> Result<PathBuf, RetrievalError> {
        match &self.location {
            ModelLocation::Bundled(path) => {
                if is_usable_file(path).await {
                    debug!(path = %path.display(), "Using bundled model");
                    Ok(path.clone())
                } else {
                    Err(RetrievalError::ArtifactUnresolvable(format!(
                        "no model file at {}",
                        path.display()
                    )))
                }
            }
            ModelLocation::Remote(url) => {
                let target = self
                    .cached_path()
                    .ok_or_else(|| FetchError::InvalidLocation(url.to_string()))?;

                if is_usable_file(&target).await {
                    debug!(path = %target.display(), "Reusing cached model");
                    return Ok(target);
                }

                self.download(url, &target).await?;
                Ok(target)
            }
        }
    }

    async fn download(&self, url: &Url, target: &Path) -> Result<(), FetchError> {
        info!(%url, "Downloading model artifact");
        let bytes = self.fetcher.fetch(url).await?;
        if bytes.is_empty() {
            return Err(FetchError::Http(format!("{} returned an empty body", url)));
        }

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;

        let partial = target.with_extension("onnx.part");
        tokio::fs::write(&partial, &bytes)
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;
        tokio::fs::rename(&partial, target)
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;

        info!(path = %target.display(), bytes = bytes.len(), "Model artifact cached");
        Ok(())
    }

    /// Remove a materialized download. Returns whether anything was removed.
    pub async fn clear_cache(&self) -> Result<bool, FetchError> {
        let Some(target) = self.cached_path() else {
            return Ok(false);
        };

        match tokio::fs::remove_file(&target).await {
            Ok(()) => {
                info!(path = %target.display(), "Cleared cached model");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FetchError::Io(e.to_string())),
        }
    }
}

async fn is_usable_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::CountingFetcher;

    fn remote() -> ModelLocation {
        ModelLocation::parse("https://example.org/models/e5-small.onnx").unwrap()
    }

    #[test]
    fn test_parse_locations() {
        assert_eq!(
            ModelLocation::parse("assets/model.onnx").unwrap(),
            ModelLocation::Bundled(PathBuf::from("assets/model.onnx"))
        );
        assert!(matches!(remote(), ModelLocation::Remote(_)));
        assert!(matches!(
            ModelLocation::parse("file:///opt/app/model.onnx").unwrap(),
            ModelLocation::Bundled(p) if p == Path::new("/opt/app/model.onnx")
        ));
        assert!(ModelLocation::parse("   ").is_err());
    }

    #[tokio::test]
    async fn test_bundled_missing_is_unresolvable() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ArtifactResolver::new(
            ModelLocation::Bundled(dir.path().join("missing.onnx")),
            dir.path(),
            Arc::new(CountingFetcher::new(b"x".to_vec())),
        );
        let err = resolver.resolve().await.unwrap_err();
        assert!(matches!(err, RetrievalError::ArtifactUnresolvable(_)));
    }

    #[tokio::test]
    async fn test_remote_downloaded_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::new(b"onnx-bytes".to_vec()));
        let resolver = ArtifactResolver::new(remote(), dir.path().join("cache"), fetcher.clone());

        let first = resolver.resolve().await.unwrap();
        let second = resolver.resolve().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.file_name().unwrap(), "e5-small.onnx");
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(std::fs::read(&first).unwrap(), b"onnx-bytes");
        assert!(!first.with_extension("onnx.part").exists());
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::new(b"onnx-bytes".to_vec()));
        let resolver = ArtifactResolver::new(remote(), dir.path(), fetcher.clone());

        resolver.resolve().await.unwrap();
        assert!(resolver.clear_cache().await.unwrap());
        assert!(!resolver.clear_cache().await.unwrap());
        resolver.resolve().await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_cache() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::failing());
        let resolver = ArtifactResolver::new(remote(), dir.path(), fetcher.clone());

        assert!(resolver.resolve().await.is_err());
        assert!(!resolver.cached_path().unwrap().exists());
    }
}
