//! Examples read from a JSON-lines file.
//!
//! Each non-blank line is `{"features": [f32, ...], "label": f32}`.

use crate::config::parse_class_config;
use crate::dataset::{Dataset, Example, InMemoryDataset};
use crate::error::{FieldError, TaskError, TaskResult, ValidationErrors};
use crate::input::InputProvider;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CLASSNAME: &str = "eoflow.input.JsonlInput";

fn default_batch_size() -> usize {
    32
}

fn default_seed() -> u64 {
    42
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsonlInputConfig {
    pub path: PathBuf,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct JsonlInput {
    config: JsonlInputConfig,
}

impl JsonlInput {
    pub fn new(config: JsonlInputConfig) -> TaskResult<Self> {
        let mut errors = Vec::new();
        if config.path.as_os_str().is_empty() {
            errors.push(FieldError::new("input_config.config.path", "must not be empty"));
        }
        if config.batch_size == 0 {
            errors.push(FieldError::new("input_config.config.batch_size", "must be >= 1"));
        }
        ValidationErrors(errors).into_result()?;
        Ok(Self { config })
    }

    pub fn from_config(config: &Value) -> TaskResult<Self> {
        Self::new(parse_class_config(config, "input_config.config")?)
    }
}

/// Parse every example in a JSON-lines file.
pub fn read_examples(path: &Path) -> TaskResult<Vec<Example>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| TaskError::Execution(format!("failed to read {}: {e}", path.display())))?;

    let mut examples = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let ex: Example = serde_json::from_str(line).map_err(|e| {
            TaskError::Execution(format!("{}: failed to parse line {}: {e}", path.display(), idx + 1))
        })?;
        examples.push(ex);
    }

    if examples.is_empty() {
        return Err(TaskError::Execution(format!("{} contains no examples", path.display())));
    }
    Ok(examples)
}

impl InputProvider for JsonlInput {
    fn get_dataset(&self) -> TaskResult<Box<dyn Dataset>> {
        let examples = read_examples(&self.config.path)?;
        debug!(path = %self.config.path.display(), count = examples.len(), "Loaded jsonl examples");

        let mut dataset = InMemoryDataset::new(examples, self.config.batch_size)?;
        if self.config.shuffle {
            dataset = dataset.with_shuffle(self.config.seed);
        }
        Ok(Box::new(dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Fetch;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_reads_examples_and_skips_blank_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.jsonl");
        std::fs::write(
            &path,
            "{\"features\": [1.0, 2.0], \"label\": 3.0}\n\n{\"features\": [0.5, 0.5], \"label\": 1.0}\n",
        )
        .unwrap();

        let input = JsonlInput::from_config(&json!({"path": path, "batch_size": 8})).unwrap();
        let mut ds = input.get_dataset().unwrap();
        assert_eq!(ds.element_spec().num_features, 2);
        ds.initialize().unwrap();
        let Fetch::Batch(batch) = ds.next_batch().unwrap() else { panic!("expected a batch") };
        assert_eq!(batch.labels, vec![3.0, 1.0]);
        assert_eq!(ds.next_batch().unwrap(), Fetch::Exhausted);
    }

    #[test]
    fn test_malformed_line_names_line_number() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.jsonl");
        std::fs::write(&path, "{\"features\": [1.0], \"label\": 1.0}\nnot json\n").unwrap();

        let err = read_examples(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_ragged_features_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.jsonl");
        std::fs::write(&path, "{\"features\": [1.0], \"label\": 1.0}\n{\"features\": [1.0, 2.0], \"label\": 1.0}\n")
            .unwrap();

        let input = JsonlInput::from_config(&json!({"path": path})).unwrap();
        assert!(matches!(input.get_dataset(), Err(TaskError::Execution(_))));
    }

    #[test]
    fn test_empty_file_and_missing_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.jsonl");
        std::fs::write(&path, "\n").unwrap();
        assert!(read_examples(&path).is_err());
        assert!(read_examples(&temp.path().join("missing.jsonl")).is_err());

        assert!(matches!(JsonlInput::from_config(&json!({})), Err(TaskError::Validation(_))));
    }
}
