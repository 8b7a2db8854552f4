//!
//! Configuration module
//!

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};
use crate::download::error::DownloadError;

/// Artifact file name prefix, artifacts are `part1` .. `partN`
pub const DEFAULT_ARTIFACT_PREFIX: &str = "part";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Number of parts, CPU count when unset
    pub split_count: Option<usize>,
    pub probe_timeout_secs: u64,
    /// Directory receiving artifacts and the final file
    pub work_dir: PathBuf,
    pub artifact_prefix: String,
    /// Reject non-206 responses and short or long chunk bodies
    pub strict_chunk_check: bool,
    pub user_agent: Option<String>,
}

impl Config {
    pub fn load_from_file(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_path = file_path.as_ref();
        let config_data = fs::read_to_string(file_path)
            .with_context(|| format!("Read config failed: {}", file_path.display()))?;
        let config: Config = serde_json::from_str(&config_data)
            .with_context(|| format!("Parse config failed: {}", file_path.display()))?;

        Ok(config)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Configured split count, or the available parallelism of this machine.
    /// An explicit zero is rejected.
    pub fn split_count(&self) -> Result<NonZeroUsize, DownloadError> {
        match self.split_count {
            Some(count) => NonZeroUsize::new(count).ok_or_else(|| {
                DownloadError::InvalidInput("split_count must be at least 1".to_string())
            }),
            None => Ok(std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)),
        }
    }

    pub fn artifact_path(&self, part: usize) -> PathBuf {
        self.work_dir.join(format!("{}{}", self.artifact_prefix, part))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            split_count: None,
            probe_timeout_secs: 5,
            work_dir: PathBuf::from("."),
            artifact_prefix: DEFAULT_ARTIFACT_PREFIX.to_string(),
            strict_chunk_check: true,
            user_agent: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use super::*;

    #[test]
    fn should_fill_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "split_count": 3, "work_dir": "/tmp/dl" }}"#).unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.split_count().unwrap().get(), 3);
        assert_eq!(config.work_dir, PathBuf::from("/tmp/dl"));
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.artifact_prefix, "part");
        assert!(config.strict_chunk_check);
    }

    #[test]
    fn should_fall_back_to_cpu_count() {
        let config = Config::default();
        assert!(config.split_count().unwrap().get() >= 1);
    }

    #[test]
    fn should_reject_zero_split_count() {
        let config = Config { split_count: Some(0), ..Config::default() };
        assert!(matches!(config.split_count(), Err(DownloadError::InvalidInput(_))));
    }

    #[test]
    fn should_name_artifacts_by_part() {
        let config = Config { work_dir: PathBuf::from("dl"), ..Config::default() };
        assert_eq!(config.artifact_path(1), PathBuf::from("dl").join("part1"));
        assert_eq!(config.artifact_path(12), PathBuf::from("dl").join("part12"));
    }

    #[test]
    fn should_reject_broken_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ split_count: }}").unwrap();
        assert!(Config::load_from_file(file.path()).is_err());
    }
}
