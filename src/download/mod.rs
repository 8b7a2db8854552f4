//!
//! # Download module
//! Parallel range download: probe, split, fetch concurrently, merge in order.
//!

pub mod config;
pub mod logger;
pub mod error;
pub mod hook;
pub mod util;
pub mod chunk_range;
pub mod chunk_item;
pub mod chunk_manager;
pub mod merger;
pub mod progress_bar;
pub mod downloader;

pub use config::Config;
pub use downloader::{DownloadJob, Downloader, JobState};
pub use error::{DownloadError, FetchError, MergeError};
