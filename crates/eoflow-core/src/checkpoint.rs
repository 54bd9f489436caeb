//! Checkpoint persistence.
//!
//! Each save writes a new `model.ckpt-<step>` file and appends an entry to the
//! `checkpoint` index in the same directory. Existing checkpoint files are
//! never overwritten.

use crate::error::{TaskError, TaskResult};
use crate::layout::OutputLayout;
use crate::model::TrainOp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Contents of a single checkpoint file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointFile {
    pub model: String,
    pub global_step: u64,
    pub created_at: DateTime<Utc>,
    pub state: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub global_step: u64,
    pub path: PathBuf,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

/// The `checkpoint` index file: every checkpoint written, in save order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointIndex {
    pub checkpoints: Vec<CheckpointEntry>,
}

pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Writes checkpoints for one output directory.
#[derive(Debug, Clone)]
pub struct Saver {
    layout: OutputLayout,
}

impl Saver {
    #[must_use]
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }

    #[must_use]
    pub fn for_output_dir(output_directory: &Path) -> Self {
        Self::new(OutputLayout::new(output_directory.to_path_buf()))
    }

    #[must_use]
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Persist the state of `op` tagged with `global_step`.
    pub fn save(&self, model: &str, op: &dyn TrainOp, global_step: u64) -> TaskResult<PathBuf> {
        self.layout.ensure_dirs()?;

        let file = CheckpointFile {
            model: model.to_string(),
            global_step,
            created_at: Utc::now(),
            state: op.save_state()?,
        };
        let bytes = serde_json::to_vec_pretty(&file)?;
        let path = self.layout.checkpoint_path(global_step);

        write_new_file(&path, |out| out.write_all(&bytes))?;

        let index_path = self.layout.index_path();
        let mut index = read_index(&index_path)?;
        index.checkpoints.push(CheckpointEntry {
            global_step,
            path: path.clone(),
            sha256: sha256_bytes(&bytes),
            created_at: file.created_at,
        });
        write_index(&index_path, &index)?;

        debug!(path = %path.display(), global_step, "Wrote checkpoint");
        Ok(path)
    }
}

/// Create `path` and fill it through `write`. A partially written file is
/// removed so the step can be saved again.
fn write_new_file(path: &Path, write: impl FnOnce(&mut File) -> std::io::Result<()>) -> TaskResult<()> {
    let mut out = OpenOptions::new().write(true).create_new(true).open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            TaskError::Checkpoint(format!("refusing to overwrite existing checkpoint {}", path.display()))
        } else {
            TaskError::Checkpoint(format!("failed to create {}: {e}", path.display()))
        }
    })?;

    if let Err(e) = write(&mut out).and_then(|()| out.sync_all()) {
        drop(out);
        let _ = std::fs::remove_file(path);
        return Err(TaskError::Checkpoint(format!("failed to write {}: {e}", path.display())));
    }
    Ok(())
}

/// Replace the index through a temp file and rename.
fn write_index(path: &Path, index: &CheckpointIndex) -> TaskResult<()> {
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, serde_json::to_vec_pretty(index)?)?;
    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        TaskError::Checkpoint(format!("failed to replace checkpoint index {}: {e}", path.display()))
    })
}

fn read_index(path: &Path) -> TaskResult<CheckpointIndex> {
    match std::fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| TaskError::Checkpoint(format!("corrupt checkpoint index {}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CheckpointIndex::default()),
        Err(e) => Err(e.into()),
    }
}

/// Checkpoints recorded for `output_directory`, oldest first.
pub fn list_checkpoints(output_directory: &Path) -> TaskResult<Vec<CheckpointEntry>> {
    let layout = OutputLayout::new(output_directory.to_path_buf());
    Ok(read_index(&layout.index_path())?.checkpoints)
}

pub fn latest_checkpoint(output_directory: &Path) -> TaskResult<Option<CheckpointEntry>> {
    Ok(list_checkpoints(output_directory)?.pop())
}

/// Load a checkpoint file, verifying its digest when an index entry is given.
pub fn read_checkpoint(path: &Path, expected: Option<&CheckpointEntry>) -> TaskResult<CheckpointFile> {
    let bytes = std::fs::read(path)?;
    if let Some(entry) = expected {
        let actual = sha256_bytes(&bytes);
        if actual != entry.sha256 {
            return Err(TaskError::Checkpoint(format!(
                "digest mismatch for {}: expected {}, found {actual}",
                path.display(),
                entry.sha256
            )));
        }
    }
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Batch;
    use crate::model::StepMetrics;
    use serde_json::json;
    use tempfile::TempDir;

    struct FixedOp(u64);

    impl TrainOp for FixedOp {
        fn initialize(&mut self) -> TaskResult<()> {
            Ok(())
        }

        fn run(&mut self, _batch: &Batch) -> TaskResult<StepMetrics> {
            Ok(StepMetrics::default())
        }

        fn global_step(&self) -> u64 {
            self.0
        }

        fn save_state(&self) -> TaskResult<serde_json::Value> {
            Ok(json!({"weights": [1.0, 2.0], "step": self.0}))
        }
    }

    #[test]
    fn test_save_writes_step_tagged_file_and_index() {
        let temp = TempDir::new().unwrap();
        let saver = Saver::for_output_dir(temp.path());

        let p100 = saver.save("m", &FixedOp(100), 100).unwrap();
        let p200 = saver.save("m", &FixedOp(200), 200).unwrap();
        assert_eq!(p100, temp.path().join("checkpoints").join("model.ckpt-100"));
        assert!(p200.exists());

        let entries = list_checkpoints(temp.path()).unwrap();
        let steps: Vec<u64> = entries.iter().map(|e| e.global_step).collect();
        assert_eq!(steps, vec![100, 200]);

        let latest = latest_checkpoint(temp.path()).unwrap().unwrap();
        let file = read_checkpoint(&latest.path, Some(&latest)).unwrap();
        assert_eq!(file.global_step, 200);
        assert_eq!(file.model, "m");
        assert_eq!(file.state["step"], json!(200));
    }

    #[test]
    fn test_existing_checkpoint_is_not_overwritten() {
        let temp = TempDir::new().unwrap();
        let saver = Saver::for_output_dir(temp.path());
        let path = saver.save("m", &FixedOp(5), 5).unwrap();
        let before = std::fs::read(&path).unwrap();

        let err = saver.save("m", &FixedOp(5), 5).unwrap_err();
        assert!(matches!(err, TaskError::Checkpoint(_)));
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(list_checkpoints(temp.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_index_replaced_without_leftover_temp_file() {
        let temp = TempDir::new().unwrap();
        let saver = Saver::for_output_dir(temp.path());
        saver.save("m", &FixedOp(1), 1).unwrap();
        saver.save("m", &FixedOp(2), 2).unwrap();

        let entries: Vec<String> = std::fs::read_dir(saver.layout().checkpoints_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(!entries.iter().any(|name| name.ends_with(".tmp")));
        assert_eq!(list_checkpoints(temp.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_stale_index_temp_file_is_ignored() {
        let temp = TempDir::new().unwrap();
        let saver = Saver::for_output_dir(temp.path());
        saver.save("m", &FixedOp(1), 1).unwrap();

        // Left behind by an index write that never reached the rename.
        std::fs::write(saver.layout().index_path().with_extension("tmp"), b"{\"checkpoints\": [").unwrap();

        assert_eq!(list_checkpoints(temp.path()).unwrap().len(), 1);
        saver.save("m", &FixedOp(2), 2).unwrap();
        let steps: Vec<u64> = list_checkpoints(temp.path()).unwrap().iter().map(|e| e.global_step).collect();
        assert_eq!(steps, vec![1, 2]);
    }

    #[test]
    fn test_failed_write_removes_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("model.ckpt-3");

        let err = write_new_file(&path, |out| {
            out.write_all(b"{\"model\":")?;
            Err(std::io::Error::other("disk full"))
        })
        .unwrap_err();
        assert!(matches!(err, TaskError::Checkpoint(_)));
        assert!(!path.exists());

        write_new_file(&path, |out| out.write_all(b"{}")).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
    }

    #[test]
    fn test_missing_index_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(list_checkpoints(temp.path()).unwrap().is_empty());
        assert!(latest_checkpoint(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_digest_mismatch_detected() {
        let temp = TempDir::new().unwrap();
        let saver = Saver::for_output_dir(temp.path());
        let path = saver.save("m", &FixedOp(1), 1).unwrap();
        let entry = latest_checkpoint(temp.path()).unwrap().unwrap();

        std::fs::write(&path, b"{}").unwrap();
        assert!(matches!(read_checkpoint(&path, Some(&entry)), Err(TaskError::Checkpoint(_))));
    }
}
