//! Executes a complete `{model, task}` configuration document.

use crate::config::{validate_object_configuration, ObjectConfiguration};
use crate::error::{FieldError, TaskError, TaskResult, ValidationErrors};
use crate::progress::ProgressSink;
use crate::registry::Registry;
use crate::task::RunSummary;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    pub model: ObjectConfiguration,
    pub task: ObjectConfiguration,
}

impl ExecutionConfig {
    pub fn from_value(value: Value) -> TaskResult<Self> {
        ValidationErrors(validate_execution_config(&value)).into_result()?;
        serde_json::from_value(value).map_err(|e| TaskError::validation("<root>", e.to_string()))
    }
}

#[must_use]
pub fn validate_execution_config(value: &Value) -> Vec<FieldError> {
    let Some(map) = value.as_object() else {
        return vec![FieldError::new("<root>", "configuration must be an object")];
    };

    let mut errors: Vec<FieldError> = map
        .keys()
        .filter(|k| !matches!(k.as_str(), "model" | "task"))
        .map(|k| FieldError::new(k.as_str(), "unknown field"))
        .collect();

    for section in ["model", "task"] {
        match map.get(section) {
            Some(v) => errors.extend(validate_object_configuration(v, section)),
            None => errors.push(FieldError::new(section, "field is required")),
        }
    }
    errors
}

/// Resolve and construct the model and the task, then run the task.
pub fn execute(value: Value, registry: &Arc<Registry>, progress: &dyn ProgressSink) -> TaskResult<RunSummary> {
    let ExecutionConfig { model, task } = ExecutionConfig::from_value(value)?;

    let model_ctor = registry.resolve_model(&model.classname)?;
    let task_ctor = registry.resolve_task(&task.classname)?;

    let model_instance = model_ctor(&model.config)?;
    let mut task_instance = task_ctor(task.config, model_instance, Arc::clone(registry))?;

    info!(task = %task.classname, model = %model.classname, "Executing task");
    task_instance.run(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopProgressSink;
    use serde_json::json;
    use tempfile::TempDir;

    fn document(out: &std::path::Path) -> Value {
        json!({
            "model": {"classname": "eoflow.models.LinearRegressionModel", "config": {"learning_rate": 0.05}},
            "task": {
                "classname": "eoflow.tasks.TrainTask",
                "config": {
                    "num_epochs": 3,
                    "output_directory": out,
                    "save_steps": 2,
                    "input_config": {
                        "classname": "eoflow.input.RandomRegressionInput",
                        "config": {"num_examples": 8, "batch_size": 4}
                    }
                }
            }
        })
    }

    #[test]
    fn test_execute_runs_train_task() {
        let temp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::with_builtins());
        let summary = execute(document(temp.path()), &registry, &NoopProgressSink).unwrap();
        assert_eq!(summary.steps, 6);
        assert_eq!(summary.checkpoints.len(), 3);
    }

    #[test]
    fn test_missing_sections_reported() {
        let errors = validate_execution_config(&json!({"task": {"classname": "x"}, "extra": 1}));
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["extra", "model"]);
    }

    #[test]
    fn test_model_name_resolving_to_task_is_contract_violation() {
        let temp = TempDir::new().unwrap();
        let mut doc = document(temp.path());
        doc["model"]["classname"] = json!("eoflow.tasks.TrainTask");
        let registry = Arc::new(Registry::with_builtins());
        assert!(matches!(
            execute(doc, &registry, &NoopProgressSink),
            Err(TaskError::ContractViolation { .. })
        ));
    }

    #[test]
    fn test_invalid_task_config_surfaces_validation() {
        let temp = TempDir::new().unwrap();
        let mut doc = document(temp.path());
        doc["task"]["config"]["num_epochs"] = json!(0);
        let registry = Arc::new(Registry::with_builtins());
        assert!(matches!(execute(doc, &registry, &NoopProgressSink), Err(TaskError::Validation(_))));
    }
}
