use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::Operation;
use crate::install::{OperationError, resolve_in_root};
use crate::ports::{ArtifactFetcher, Environment};

/// `download`: fetch each URL into the root directory.
///
/// The local file name is the last path segment of the URL, without query
/// string or fragment.
pub struct DownloadOperation {
    files: Vec<String>,
    fetcher: Arc<dyn ArtifactFetcher>,
}

impl DownloadOperation {
    pub fn new(files: Vec<String>, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        Self { files, fetcher }
    }
}

fn file_name(url: &str) -> Option<&str> {
    let without_suffix = url.split(['?', '#']).next().unwrap_or(url);
    let path = without_suffix
        .split_once("://")
        .map_or(without_suffix, |(_, rest)| rest);
    // Host-only URLs have no file name.
    let (_, path) = path.split_once('/')?;
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

#[async_trait]
impl Operation for DownloadOperation {
    fn name(&self) -> &'static str {
        "download"
    }

    async fn run(&self, environment: &dyn Environment) -> Result<(), OperationError> {
        for url in &self.files {
            let name = file_name(url).ok_or_else(|| OperationError::InvalidPath(url.clone()))?;
            let destination = resolve_in_root(environment.root_directory(), name)?;

            environment.display_to_console(&format!("Downloading {url}"));
            let bytes = self.fetcher.fetch(url, &destination).await?;
            info!(url = %url, bytes, path = %destination.display(), "Downloaded artifact");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FetchError;
    use crate::testing::FakeEnvironment;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingFetcher {
        fetched: Mutex<Vec<(String, PathBuf)>>,
    }

    #[async_trait]
    impl ArtifactFetcher for RecordingFetcher {
        async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, FetchError> {
            self.fetched
                .lock()
                .unwrap()
                .push((url.to_string(), destination.to_path_buf()));
            Ok(3)
        }
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name("https://cdn.example.com/a/b/server.jar?sig=1#x"),
            Some("server.jar")
        );
        assert_eq!(file_name("https://cdn.example.com/"), None);
        assert_eq!(file_name("https://cdn.example.com"), None);
    }

    #[tokio::test]
    async fn test_fetches_each_file_into_root() {
        let dir = tempfile::tempdir().unwrap();
        let env = FakeEnvironment::new(dir.path());
        let fetcher = Arc::new(RecordingFetcher::default());

        DownloadOperation::new(
            vec![
                "https://cdn.example.com/server.jar".to_string(),
                "https://cdn.example.com/cfg/ops.json".to_string(),
            ],
            Arc::clone(&fetcher) as Arc<dyn ArtifactFetcher>,
        )
        .run(&env)
        .await
        .unwrap();

        let fetched = fetcher.fetched.lock().unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].1, dir.path().join("server.jar"));
        assert_eq!(fetched[1].1, dir.path().join("ops.json"));
    }

    #[tokio::test]
    async fn test_url_without_file_name_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let env = FakeEnvironment::new(dir.path());

        let err = DownloadOperation::new(
            vec!["https://cdn.example.com/".to_string()],
            Arc::new(RecordingFetcher::default()),
        )
        .run(&env)
        .await
        .unwrap_err();
        assert!(matches!(err, OperationError::InvalidPath(_)));
    }
}
