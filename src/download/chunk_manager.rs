use std::sync::Arc;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::{Client, Request};
use crate::download::chunk_item::ChunkItem;
use crate::download::chunk_range::ChunkInfo;
use crate::download::config::Config;
use crate::download::error::{DownloadError, FetchError};
use crate::download::hook::DownloadHook;
use crate::download::util::clone_request;

/// Runs one fetch task per chunk and joins them all
pub struct ChunkManager {
    client: Client,
    config: Arc<Config>,
    hook: Arc<dyn DownloadHook>,
}

impl ChunkManager {
    pub fn new(client: Client, config: Arc<Config>, hook: Arc<dyn DownloadHook>) -> Self {
        Self {
            client,
            config,
            hook,
        }
    }

    /// Spawns every chunk up front and waits for all of them, even after a failure.
    /// The first failure observed is returned. Returns the total bytes written otherwise.
    pub async fn download(
        &self,
        request: &Request,
        chunks: &[ChunkInfo],
        content_length: u64,
    ) -> Result<u64, DownloadError> {
        let mut futures_unordered = FuturesUnordered::new();

        for chunk_info in chunks {
            let chunk_item = ChunkItem::new(
                *chunk_info,
                self.client.clone(),
                self.hook.clone(),
                content_length,
                self.config.strict_chunk_check,
            );
            let artifact = self.config.artifact_path(chunk_info.index);
            let request = clone_request(request);

            info!(
                "part{} start {}-{}",
                chunk_info.index, chunk_info.range.start, chunk_info.range.end
            );
            let handle = tokio::spawn(async move {
                chunk_item.download(&request, &artifact).await
            });

            let part = chunk_info.index;
            futures_unordered.push(async move { (part, handle.await) });
        }

        let mut first_error = None;
        let mut total = 0u64;
        while let Some((part, joined)) = futures_unordered.next().await {
            let result = joined.unwrap_or_else(|err| Err(FetchError::TaskPanicked(err.to_string())));

            match result {
                Ok(written) => {
                    debug!("part{} finished, {} bytes", part, written);
                    total += written;
                }
                Err(err) => {
                    warn!("part{} failed: {}", part, err);
                    if first_error.is_none() {
                        first_error = Some(DownloadError::FetchFailed { part, source: err });
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(total),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use url::Url;
    use super::*;
    use crate::download::chunk_range::{compute_ranges, ChunkRange};
    use crate::download::hook::NoopHook;

    fn create_manager(work_dir: PathBuf) -> ChunkManager {
        let config = Config {
            work_dir,
            ..Config::default()
        };

        let client = Client::builder().no_proxy().build().unwrap();
        ChunkManager::new(client, Arc::new(config), Arc::new(NoopHook))
    }

    #[tokio::test]
    async fn should_create_every_artifact_for_empty_resource() {
        let dir = TempDir::new().unwrap();
        let manager = create_manager(dir.path().to_path_buf());
        let chunks = compute_ranges(0, NonZeroUsize::new(3).unwrap());
        let request = Request::new(reqwest::Method::GET, Url::parse("http://127.0.0.1:9/a").unwrap());

        let total = manager.download(&request, &chunks, 0).await.unwrap();
        assert_eq!(total, 0);
        for part in 1..=3 {
            assert!(dir.path().join(format!("part{part}")).exists());
        }
    }

    #[tokio::test]
    async fn should_wait_for_all_chunks_and_report_failure() {
        let dir = TempDir::new().unwrap();
        let manager = create_manager(dir.path().to_path_buf());
        // parts 1 and 2 cover no bytes, part 3 needs the network and fails
        let chunks = vec![
            ChunkInfo { index: 1, range: ChunkRange::new(1, 0) },
            ChunkInfo { index: 2, range: ChunkRange::new(1, 0) },
            ChunkInfo { index: 3, range: ChunkRange::new(0, 4) },
        ];
        let request = Request::new(reqwest::Method::GET, Url::parse("http://127.0.0.1:9/a").unwrap());

        let result = manager.download(&request, &chunks, 5).await;
        assert!(matches!(result, Err(DownloadError::FetchFailed { part: 3, .. })));
        for part in 1..=3 {
            assert!(dir.path().join(format!("part{part}")).exists());
        }
    }
}
