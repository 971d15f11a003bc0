//! Artifact fetcher port used by `download` install steps.

use async_trait::async_trait;
use std::path::Path;

use super::FetchError;

/// Downloads a remote artifact to a local file.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetch `url` into `destination`, replacing any existing file.
    ///
    /// Returns the number of bytes written.
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, FetchError>;
}
