//!
//! # Hook module
//! Injection points the coordinator and fetchers call while a job runs. Used for
//! wire-traffic dumps and progress display; the transfer logic never prints on its own.
//!

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use log::debug;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::{Request, StatusCode};
use crate::download::chunk_range::ChunkInfo;
use crate::download::downloader::{DownloadJob, JobState};
use crate::download::progress_bar::ProgressBar;

pub trait DownloadHook: Send + Sync + 'static {
    fn on_state_change(&self, _state: JobState) {}

    fn on_probe_response(&self, _url: &str, _status: StatusCode, _headers: &HeaderMap) {}

    fn on_probe_complete(&self, _job: &DownloadJob) {}

    fn on_request(&self, _chunk: &ChunkInfo, _request: &Request) {}

    fn on_response(&self, _chunk: &ChunkInfo, _status: StatusCode, _headers: &HeaderMap) {}

    fn on_bytes_received(&self, _chunk: &ChunkInfo, _len: u64) {}

    fn on_chunk_complete(&self, _chunk: &ChunkInfo, _written: u64) {}
}

pub struct NoopHook;

impl DownloadHook for NoopHook {}

/// Dumps request and response headers through the `log` facade
pub struct LogHook;

impl LogHook {
    fn dump_headers(headers: &HeaderMap) -> String {
        let mut dump = String::new();
        for (name, value) in headers {
            dump.push_str(&format!("\n  {}: {}", name, value.to_str().unwrap_or("<binary>")));
        }

        dump
    }
}

impl DownloadHook for LogHook {
    fn on_state_change(&self, state: JobState) {
        debug!("Job state -> {:?}", state);
    }

    fn on_probe_response(&self, url: &str, status: StatusCode, headers: &HeaderMap) {
        debug!("HEAD {} -> {}{}", url, status, Self::dump_headers(headers));
    }

    fn on_request(&self, chunk: &ChunkInfo, request: &Request) {
        debug!(
            "part{} >> {} {}{}",
            chunk.index,
            request.method(),
            request.url(),
            Self::dump_headers(request.headers())
        );
    }

    fn on_response(&self, chunk: &ChunkInfo, status: StatusCode, headers: &HeaderMap) {
        debug!("part{} << {}{}", chunk.index, status, Self::dump_headers(headers));
    }

    fn on_chunk_complete(&self, chunk: &ChunkInfo, written: u64) {
        debug!("part{} done, {} bytes", chunk.index, written);
    }
}

struct ProgressState {
    bar: ProgressBar,
    last_draw_len: u64,
}

/// Terminal progress bar fed by received byte counts
pub struct ProgressHook {
    total: AtomicU64,
    downloaded: AtomicU64,
    redraw_step: u64,
    state: Mutex<ProgressState>,
}

impl ProgressHook {
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            downloaded: AtomicU64::new(0),
            redraw_step: 64 * 1024,
            state: Mutex::new(ProgressState {
                bar: ProgressBar::new(100),
                last_draw_len: 0,
            }),
        }
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    fn draw(&self, force: bool) {
        let downloaded = self.downloaded();
        let total = self.total.load(Ordering::Relaxed);

        // try_lock: a fetcher already drawing is enough
        let mut state = if force {
            self.state.lock()
        } else {
            match self.state.try_lock() {
                Some(state) => state,
                None => return,
            }
        };

        if !force && downloaded.saturating_sub(state.last_draw_len) < self.redraw_step {
            return;
        }

        let elapsed = state.bar.elapsed_secs();
        let speed = if elapsed > 0.0 { (downloaded as f64 / elapsed) as u64 } else { 0 };
        state.last_draw_len = downloaded;
        state.bar.print(downloaded, total, speed);
    }
}

impl Default for ProgressHook {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadHook for ProgressHook {
    fn on_state_change(&self, state: JobState) {
        if state.is_terminal() {
            self.draw(true);
            self.state.lock().bar.finish();
        }
    }

    fn on_probe_complete(&self, job: &DownloadJob) {
        self.total.store(job.content_length, Ordering::Relaxed);
    }

    fn on_bytes_received(&self, _chunk: &ChunkInfo, len: u64) {
        self.downloaded.fetch_add(len, Ordering::Relaxed);
        self.draw(false);
    }
}

/// Fans every call out to several hooks
#[derive(Default)]
pub struct HookSet {
    hooks: Vec<Arc<dyn DownloadHook>>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: Arc<dyn DownloadHook>) {
        self.hooks.push(hook);
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl DownloadHook for HookSet {
    fn on_state_change(&self, state: JobState) {
        self.hooks.iter().for_each(|hook| hook.on_state_change(state));
    }

    fn on_probe_response(&self, url: &str, status: StatusCode, headers: &HeaderMap) {
        self.hooks.iter().for_each(|hook| hook.on_probe_response(url, status, headers));
    }

    fn on_probe_complete(&self, job: &DownloadJob) {
        self.hooks.iter().for_each(|hook| hook.on_probe_complete(job));
    }

    fn on_request(&self, chunk: &ChunkInfo, request: &Request) {
        self.hooks.iter().for_each(|hook| hook.on_request(chunk, request));
    }

    fn on_response(&self, chunk: &ChunkInfo, status: StatusCode, headers: &HeaderMap) {
        self.hooks.iter().for_each(|hook| hook.on_response(chunk, status, headers));
    }

    fn on_bytes_received(&self, chunk: &ChunkInfo, len: u64) {
        self.hooks.iter().for_each(|hook| hook.on_bytes_received(chunk, len));
    }

    fn on_chunk_complete(&self, chunk: &ChunkInfo, written: u64) {
        self.hooks.iter().for_each(|hook| hook.on_chunk_complete(chunk, written));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::chunk_range::ChunkRange;

    #[derive(Default)]
    struct CountingHook {
        bytes: AtomicU64,
        completed: AtomicU64,
    }

    impl DownloadHook for CountingHook {
        fn on_bytes_received(&self, _chunk: &ChunkInfo, len: u64) {
            self.bytes.fetch_add(len, Ordering::Relaxed);
        }

        fn on_chunk_complete(&self, _chunk: &ChunkInfo, _written: u64) {
            self.completed.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn should_fan_out_to_every_hook() {
        let first = Arc::new(CountingHook::default());
        let second = Arc::new(CountingHook::default());
        let mut set = HookSet::new();
        set.push(first.clone());
        set.push(second.clone());

        let chunk = ChunkInfo { index: 1, range: ChunkRange::new(0, 9) };
        set.on_bytes_received(&chunk, 6);
        set.on_bytes_received(&chunk, 4);
        set.on_chunk_complete(&chunk, 10);

        for hook in [first, second] {
            assert_eq!(hook.bytes.load(Ordering::Relaxed), 10);
            assert_eq!(hook.completed.load(Ordering::Relaxed), 1);
        }
    }

    #[test]
    fn should_accumulate_progress() {
        let hook = ProgressHook::new();
        let chunk = ChunkInfo { index: 2, range: ChunkRange::new(4, 6) };
        hook.on_bytes_received(&chunk, 3);
        hook.on_bytes_received(&chunk, 5);

        assert_eq!(hook.downloaded(), 8);
    }
}
