//! HTTP artifact fetcher for `download` install steps.

use async_trait::async_trait;
use futures_util::StreamExt;
use kennel_core::{ArtifactFetcher, FetchError};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Streams artifacts to disk with a shared [`reqwest::Client`].
///
/// Bytes land in `<destination>.part` and are renamed into place only once
/// the whole body arrived, so a failed download never leaves a truncated file
/// under the final name.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn write_error(path: &Path, err: &std::io::Error) -> FetchError {
    FetchError::Write {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, FetchError> {
        let request_error = |reason: String| FetchError::Request {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(request_error(format!("HTTP {status}")));
        }
        debug!(url = %url, content_length = ?response.content_length(), "Download started");

        let partial = partial_path(destination);
        let mut file = File::create(&partial)
            .await
            .map_err(|e| write_error(&partial, &e))?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&partial).await;
                    return Err(request_error(e.to_string()));
                }
            };
            file.write_all(&chunk)
                .await
                .map_err(|e| write_error(&partial, &e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| write_error(&partial, &e))?;
        drop(file);

        tokio::fs::rename(&partial, destination)
            .await
            .map_err(|e| write_error(destination, &e))?;
        info!(url = %url, bytes = written, path = %destination.display(), "Download complete");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/srv/alpha/server.jar")),
            PathBuf::from("/srv/alpha/server.jar.part")
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_request_error() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("artifact.bin");

        let err = HttpFetcher::new()
            .fetch("http://127.0.0.1:1/artifact.bin", &destination)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Request { .. }));
        assert!(!destination.exists());
    }
}
