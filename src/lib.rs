pub mod download;

pub use download::{Config, DownloadError, DownloadJob, Downloader, JobState};
