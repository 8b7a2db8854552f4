use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use futures_util::Stream;
use headers::HeaderMapExt;
use log::{debug, info};
use reqwest::header::{HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Method, Request};
use tokio::fs;
use tokio::sync::watch;
use url::Url;
use crate::download::chunk_manager::ChunkManager;
use crate::download::chunk_range::compute_ranges;
use crate::download::config::Config;
use crate::download::error::DownloadError;
use crate::download::hook::{DownloadHook, NoopHook};
use crate::download::merger::ChunkMerger;
use crate::download::util::{accepts_byte_ranges, content_length, file_name_from_url};

/// Lifecycle of one job. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Probing,
    RangesComputed,
    Fetching,
    Merging,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

/// A probed download, ready to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url: Url,
    pub split_count: NonZeroUsize,
    pub content_length: u64,
    pub chunk_length: u64,
    pub output_path: PathBuf,
}

pub struct Downloader {
    client: Client,
    config: Arc<Config>,
    hook: Arc<dyn DownloadHook>,
    // state of the most recent job
    state_sender: watch::Sender<JobState>,
    state_receiver: watch::Receiver<JobState>,
}

impl Downloader {
    pub fn new(client: Client, config: Config) -> Self {
        let (state_sender, state_receiver) = watch::channel(JobState::Idle);

        Self {
            client,
            state_sender,
            state_receiver,
            config: Arc::new(config),
            hook: Arc::new(NoopHook),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn DownloadHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> JobState {
        *self.state_receiver.borrow()
    }

    /// Current state first, then every change seen by the receiver.
    /// Transitions closer together than the consumer polls may be coalesced.
    pub fn state_stream(&self) -> impl Stream<Item=JobState> + 'static {
        let mut receiver = self.state_receiver.clone();

        async_stream::stream! {
            let mut last = *receiver.borrow_and_update();
            yield last;

            while receiver.changed().await.is_ok() {
                let state = *receiver.borrow_and_update();
                if state != last {
                    last = state;
                    yield state;
                }
            }
        }
    }

    /// Checks local preconditions, then probes the remote size.
    ///
    /// Nothing touches the network until the output file and every artifact name
    /// are known to be free.
    pub async fn prepare(&self, url: &str) -> Result<DownloadJob, DownloadError> {
        self.set_state(JobState::Idle);

        let result = self.run_prepare(url).await;
        if result.is_err() {
            self.set_state(JobState::Failed);
        }

        result
    }

    /// Fetches every range concurrently and merges the artifacts.
    ///
    /// On failure the artifacts written so far are left on disk; a later `prepare`
    /// refuses to start until they are removed.
    pub async fn execute(&self, job: &DownloadJob) -> Result<PathBuf, DownloadError> {
        let result = self.run_execute(job).await;
        match result {
            Ok(_) => self.set_state(JobState::Done),
            Err(_) => self.set_state(JobState::Failed),
        }

        result
    }

    pub async fn download(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let job = self.prepare(url).await?;
        self.execute(&job).await
    }

    async fn run_prepare(&self, url: &str) -> Result<DownloadJob, DownloadError> {
        let url = Url::parse(url)
            .map_err(|err| DownloadError::InvalidInput(format!("{url}: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DownloadError::InvalidInput(format!("Unsupported scheme: {url}")));
        }

        let file_name = file_name_from_url(&url)
            .ok_or_else(|| DownloadError::InvalidInput(format!("No file name in url: {url}")))?;
        let output_path = self.config.work_dir.join(file_name);
        if path_exists(&output_path).await {
            return Err(DownloadError::AlreadyExists(output_path));
        }

        let split_count = self.config.split_count()?;
        for part in 1..=split_count.get() {
            let artifact = self.config.artifact_path(part);
            if path_exists(&artifact).await {
                return Err(DownloadError::StaleArtifact(artifact));
            }
        }

        self.set_state(JobState::Probing);
        let content_length = self.probe(&url).await?;
        let job = DownloadJob {
            chunk_length: content_length / split_count.get() as u64,
            url,
            split_count,
            content_length,
            output_path,
        };

        info!(
            "Accept-Ranges: bytes, Content-Length: {}, split: {}, chunk: {}",
            job.content_length, job.split_count, job.chunk_length
        );
        self.hook.on_probe_complete(&job);

        Ok(job)
    }

    async fn run_execute(&self, job: &DownloadJob) -> Result<PathBuf, DownloadError> {
        let chunks = compute_ranges(job.content_length, job.split_count);
        self.set_state(JobState::RangesComputed);

        self.set_state(JobState::Fetching);
        let chunk_manager = ChunkManager::new(self.client.clone(), self.config.clone(), self.hook.clone());
        let request = self.create_http_request(Method::GET, &job.url);
        let fetched = chunk_manager.download(&request, &chunks, job.content_length).await?;
        debug!("All {} parts fetched, {} bytes", chunks.len(), fetched);

        self.set_state(JobState::Merging);
        let artifacts: Vec<PathBuf> = chunks.iter()
            .map(|chunk| self.config.artifact_path(chunk.index))
            .collect();
        let merged = ChunkMerger::merge(&job.output_path, &artifacts).await?;
        info!("Downloaded {} bytes to {}", merged, job.output_path.display());

        Ok(job.output_path.clone())
    }

    /// HEAD request bounded by the probe timeout. Returns the content length.
    async fn probe(&self, url: &Url) -> Result<u64, DownloadError> {
        let timeout = self.config.probe_timeout();
        let mut request = self.create_http_request(Method::HEAD, url);
        *request.timeout_mut() = Some(timeout);

        let response = self.client.execute(request).await.map_err(|err| {
            if err.is_timeout() {
                DownloadError::ProbeTimeout { url: url.to_string(), timeout }
            } else {
                DownloadError::ProbeFailed { url: url.to_string(), reason: err.to_string() }
            }
        })?;

        let status = response.status();
        let headers = response.headers();
        self.hook.on_probe_response(url.as_str(), status, headers);

        if !status.is_success() {
            return Err(DownloadError::ProbeFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        if !accepts_byte_ranges(headers) {
            return Err(DownloadError::RangeNotSupported { url: url.to_string() });
        }

        content_length(headers).ok_or_else(|| DownloadError::ProbeFailed {
            url: url.to_string(),
            reason: "missing or invalid Content-Length".to_string(),
        })
    }

    fn create_http_request(&self, method: Method, url: &Url) -> Request {
        let mut request = Request::new(method, url.clone());
        let header_map = request.headers_mut();

        if let Some(agent) = self.config.user_agent.as_deref() {
            if let Ok(agent) = HeaderValue::from_str(agent) {
                header_map.insert(USER_AGENT, agent);
            }
        }
        header_map.insert(ACCEPT, HeaderValue::from_static("*/*"));
        header_map.typed_insert(headers::Connection::keep_alive());

        request
    }

    fn set_state(&self, state: JobState) {
        let changed = self.state_sender.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!("{:?} -> {:?}", current, state);
            *current = state;
            true
        });
        // a new job announces Idle to the hook even when the channel already holds it
        if changed || state == JobState::Idle {
            self.hook.on_state_change(state);
        }
    }
}

/// Anything other than a clean "not found" counts as occupied
async fn path_exists(path: &Path) -> bool {
    match fs::symlink_metadata(path).await {
        Ok(_) => true,
        Err(err) => err.kind() != std::io::ErrorKind::NotFound,
    }
}
