use crate::error::TaskResult;
use std::path::PathBuf;

/// Filesystem layout of a task's output directory.
///
/// Checkpoints live under `<output_directory>/checkpoints/model.ckpt-<step>`,
/// next to a `checkpoint` index file.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn checkpoints_dir(&self) -> PathBuf {
        self.root.join("checkpoints")
    }

    /// Path prefix every checkpoint file name extends with `-<step>`.
    #[must_use]
    pub fn checkpoint_prefix(&self) -> PathBuf {
        self.checkpoints_dir().join("model.ckpt")
    }

    #[must_use]
    pub fn checkpoint_path(&self, global_step: u64) -> PathBuf {
        self.checkpoints_dir().join(format!("model.ckpt-{global_step}"))
    }

    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.checkpoints_dir().join("checkpoint")
    }

    pub fn ensure_dirs(&self) -> TaskResult<()> {
        std::fs::create_dir_all(self.checkpoints_dir())?;
        Ok(())
    }
}
