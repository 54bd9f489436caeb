//! `eoflow validate`: schema-check a configuration file.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use eoflow_core::{
    load_config_file, validate_execution_config, validate_train_task_config, FieldError, TRAIN_TASK_CLASSNAME,
};
use serde_json::Value;
use std::path::Path;

/// Collect schema problems for the whole document, including the nested
/// train-task configuration when the task class is known.
fn collect_errors(value: &Value) -> Vec<FieldError> {
    let mut errors = validate_execution_config(value);

    let task = &value["task"];
    if task["classname"].as_str() == Some(TRAIN_TASK_CLASSNAME) {
        let config = task.get("config").cloned().unwrap_or(Value::Null);
        errors.extend(validate_train_task_config(&config).into_iter().map(|e| FieldError {
            field: format!("task.config.{}", e.field),
            message: e.message,
        }));
    }
    errors
}

pub fn execute(config: &Path) -> Result<()> {
    let value = load_config_file(config).with_context(|| format!("Failed to load {}", config.display()))?;
    let errors = collect_errors(&value);

    if errors.is_empty() {
        println!("{} {}", "✓".green(), format!("{} is valid", config.display()).bold());
        return Ok(());
    }

    for error in &errors {
        println!("  {} {}: {}", "✗".red(), error.field.yellow(), error.message);
    }
    bail!("{} is invalid ({} errors)", config.display(), errors.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_train_config_errors_are_prefixed() {
        let value = json!({
            "model": {"classname": "eoflow.models.LinearRegressionModel"},
            "task": {"classname": "eoflow.tasks.TrainTask", "config": {"output_directory": "out"}}
        });
        let fields: Vec<String> = collect_errors(&value).into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["task.config.num_epochs", "task.config.input_config"]);
    }

    #[test]
    fn test_other_task_configs_are_opaque() {
        let value = json!({
            "model": {"classname": "pkg.Model"},
            "task": {"classname": "pkg.Task", "config": {"anything": 1}}
        });
        assert!(collect_errors(&value).is_empty());
    }
}
