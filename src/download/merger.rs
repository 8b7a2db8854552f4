use std::path::{Path, PathBuf};
use log::debug;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use crate::download::error::MergeError;

/// Reassembles chunk artifacts into the final file
pub struct ChunkMerger;

impl ChunkMerger {
    /// Appends `artifacts` to a freshly created `output_path` in slice order, where slice
    /// position `i` is part `i + 1`. Each artifact is deleted right after it is appended.
    ///
    /// Stops at the first failure: the output stays partially written and the
    /// artifacts not yet reached stay on disk.
    pub async fn merge(output_path: &Path, artifacts: &[PathBuf]) -> Result<u64, MergeError> {
        let output = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(output_path)
            .await
            .map_err(|source| MergeError::CreateOutput { path: output_path.to_path_buf(), source })?;
        let mut writer = BufWriter::with_capacity(512 * 1024, output);
        let mut total = 0u64;

        for (i, artifact) in artifacts.iter().enumerate() {
            let part = i + 1;
            let mut file = File::open(artifact)
                .await
                .map_err(|source| MergeError::OpenArtifact { part, source })?;

            let copied = tokio::io::copy(&mut file, &mut writer)
                .await
                .map_err(|source| MergeError::Append { part, source })?;
            writer.flush()
                .await
                .map_err(|source| MergeError::Append { part, source })?;
            drop(file);

            fs::remove_file(artifact)
                .await
                .map_err(|source| MergeError::RemoveArtifact { part, source })?;

            debug!("part{} merged, {} bytes", part, copied);
            total += copied;
        }

        writer.get_mut()
            .sync_all()
            .await
            .map_err(|source| MergeError::Sync { path: output_path.to_path_buf(), source })?;

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use super::*;

    fn write_artifacts(dir: &Path, parts: &[&[u8]]) -> Vec<PathBuf> {
        parts.iter()
            .enumerate()
            .map(|(i, content)| {
                let path = dir.join(format!("part{}", i + 1));
                std::fs::write(&path, content).unwrap();
                path
            })
            .collect()
    }

    #[tokio::test]
    async fn should_concatenate_in_part_order() {
        let dir = TempDir::new().unwrap();
        let original: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let parts: Vec<&[u8]> = vec![&original[..4001], &original[4001..7000], &original[7000..]];
        let artifacts = write_artifacts(dir.path(), &parts);
        let output = dir.path().join("file.bin");

        let total = ChunkMerger::merge(&output, &artifacts).await.unwrap();

        assert_eq!(total, original.len() as u64);
        assert_eq!(std::fs::read(&output).unwrap(), original);
        assert!(artifacts.iter().all(|path| !path.exists()));
    }

    #[tokio::test]
    async fn should_merge_single_artifact() {
        let dir = TempDir::new().unwrap();
        let artifacts = write_artifacts(dir.path(), &[b"only one part".as_slice()]);
        let output = dir.path().join("file.txt");

        ChunkMerger::merge(&output, &artifacts).await.unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"only one part");
        assert!(!artifacts[0].exists());
    }

    #[tokio::test]
    async fn should_stop_at_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let artifacts = write_artifacts(
            dir.path(),
            &[b"Hello".as_slice(), b"World".as_slice(), b"!".as_slice()],
        );
        std::fs::remove_file(&artifacts[1]).unwrap();
        let output = dir.path().join("hello.txt");

        let result = ChunkMerger::merge(&output, &artifacts).await;

        assert!(matches!(result, Err(MergeError::OpenArtifact { part: 2, .. })));
        assert_eq!(std::fs::read(&output).unwrap(), b"Hello");
        assert!(!artifacts[0].exists());
        assert!(artifacts[2].exists());
    }

    #[tokio::test]
    async fn should_refuse_existing_output() {
        let dir = TempDir::new().unwrap();
        let artifacts = write_artifacts(dir.path(), &[b"data".as_slice()]);
        let output = dir.path().join("taken.bin");
        std::fs::write(&output, b"keep me").unwrap();

        let result = ChunkMerger::merge(&output, &artifacts).await;

        match result {
            Err(MergeError::CreateOutput { source, .. }) => {
                assert_eq!(source.kind(), std::io::ErrorKind::AlreadyExists);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(std::fs::read(&output).unwrap(), b"keep me");
        assert!(artifacts[0].exists());
    }

    #[tokio::test]
    async fn should_create_empty_output_without_artifacts() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("empty.bin");

        let total = ChunkMerger::merge(&output, &[]).await.unwrap();

        assert_eq!(total, 0);
        assert_eq!(std::fs::metadata(&output).unwrap().len(), 0);
    }

    #[test]
    fn should_blame_output_file_on_sync_failure() {
        let err = MergeError::Sync {
            path: PathBuf::from("dl/file.bin"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };

        let message = err.to_string();
        assert!(message.contains(&PathBuf::from("dl/file.bin").display().to_string()), "{message}");
        assert!(message.contains("disk full"));
        assert!(!message.contains("part"));
    }
}
