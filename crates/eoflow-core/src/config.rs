//! Task configuration: schema validation, defaults and config file loading.
//!
//! Configuration arrives untyped (a JSON or TOML document). It is checked by a
//! pure validation function that reports every problem at once, and only then
//! deserialized into the typed records below. Nothing downstream ever sees an
//! invalid configuration.

use crate::error::{FieldError, TaskError, TaskResult, ValidationErrors};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const DEFAULT_SAVE_STEPS: u64 = 100;

/// A class reference plus the opaque configuration it is constructed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectConfiguration {
    pub classname: String,
    #[serde(default = "empty_object")]
    pub config: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn default_save_steps() -> u64 {
    DEFAULT_SAVE_STEPS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainTaskConfig {
    /// Number of passes over the input dataset.
    pub num_epochs: u64,
    /// Directory receiving `checkpoints/model.ckpt-<step>` files.
    pub output_directory: PathBuf,
    pub input_config: ObjectConfiguration,
    /// Global-step interval between checkpoints.
    #[serde(default = "default_save_steps")]
    pub save_steps: u64,
}

impl TrainTaskConfig {
    /// Validate an untyped configuration and build the typed record.
    ///
    /// Defaults are applied here (`save_steps = 100` when absent).
    pub fn from_value(value: Value) -> TaskResult<Self> {
        ValidationErrors(validate_train_task_config(&value)).into_result()?;
        deserialize_validated(value, "")
    }
}

/// Check a train-task configuration against its schema.
///
/// Returns an empty list when the value is valid.
#[must_use]
pub fn validate_train_task_config(value: &Value) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let Some(map) = value.as_object() else {
        errors.push(FieldError::new("<root>", "configuration must be an object"));
        return errors;
    };

    check_known_keys(map, "", &["num_epochs", "output_directory", "input_config", "save_steps"], &mut errors);
    check_positive_int(map.get("num_epochs"), "num_epochs", true, &mut errors);
    check_non_empty_string(map.get("output_directory"), "output_directory", true, &mut errors);
    check_positive_int(map.get("save_steps"), "save_steps", false, &mut errors);

    match map.get("input_config") {
        None => errors.push(FieldError::new("input_config", "field is required")),
        Some(nested) => errors.extend(validate_object_configuration(nested, "input_config")),
    }

    errors
}

/// Check an `{classname, config}` record found at `path`.
#[must_use]
pub fn validate_object_configuration(value: &Value, path: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let Some(map) = value.as_object() else {
        errors.push(FieldError::new(path, "must be an object with 'classname' and 'config'"));
        return errors;
    };

    check_known_keys(map, path, &["classname", "config"], &mut errors);
    check_non_empty_string(map.get("classname"), &join(path, "classname"), true, &mut errors);
    if let Some(config) = map.get("config") {
        if !config.is_object() {
            errors.push(FieldError::new(join(path, "config"), "must be an object"));
        }
    }

    errors
}

/// Deserialize a class-specific configuration blob.
///
/// Unknown fields and type mismatches are reported as validation errors
/// located under `path`.
pub fn parse_class_config<T: DeserializeOwned>(config: &Value, path: &str) -> TaskResult<T> {
    let value = if config.is_null() { empty_object() } else { config.clone() };
    deserialize_validated(value, path)
}

fn deserialize_validated<T: DeserializeOwned>(value: Value, path: &str) -> TaskResult<T> {
    serde_json::from_value(value).map_err(|e| {
        let field = if path.is_empty() { "<root>" } else { path };
        TaskError::validation(field, e.to_string())
    })
}

/// Read a configuration document from disk.
///
/// `.toml` files are parsed as TOML, everything else as JSON.
pub fn load_config_file(path: &Path) -> TaskResult<Value> {
    let content = std::fs::read_to_string(path)?;
    let is_toml = path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("toml"));

    if is_toml {
        Ok(toml::from_str::<Value>(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() { field.to_string() } else { format!("{path}.{field}") }
}

fn check_known_keys(map: &Map<String, Value>, path: &str, known: &[&str], errors: &mut Vec<FieldError>) {
    for key in map.keys() {
        if !known.contains(&key.as_str()) {
            errors.push(FieldError::new(join(path, key), "unknown field"));
        }
    }
}

fn check_positive_int(value: Option<&Value>, field: &str, required: bool, errors: &mut Vec<FieldError>) {
    match value {
        None if required => errors.push(FieldError::new(field, "field is required")),
        None => {}
        Some(v) => match v.as_u64() {
            Some(n) if n >= 1 => {}
            Some(_) => errors.push(FieldError::new(field, "must be >= 1")),
            None if v.is_i64() => errors.push(FieldError::new(field, "must be >= 1")),
            None => errors.push(FieldError::new(field, "must be an integer")),
        },
    }
}

fn check_non_empty_string(value: Option<&Value>, field: &str, required: bool, errors: &mut Vec<FieldError>) {
    match value {
        None if required => errors.push(FieldError::new(field, "field is required")),
        None => {}
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.push(FieldError::new(field, "must not be empty"));
        }
        Some(Value::String(_)) => {}
        Some(_) => errors.push(FieldError::new(field, "must be a string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn valid() -> Value {
        json!({
            "num_epochs": 2,
            "output_directory": "/tmp/m",
            "input_config": {"classname": "pkg.MockInput", "config": {}},
        })
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_from_value_applies_save_steps_default() {
        let config = TrainTaskConfig::from_value(valid()).unwrap();
        assert_eq!(config.num_epochs, 2);
        assert_eq!(config.save_steps, DEFAULT_SAVE_STEPS);
        assert_eq!(config.input_config.classname, "pkg.MockInput");
        assert_eq!(config.output_directory, PathBuf::from("/tmp/m"));
    }

    #[test]
    fn test_missing_nested_config_defaults_to_empty_object() {
        let mut value = valid();
        value["input_config"] = json!({"classname": "pkg.MockInput"});
        let config = TrainTaskConfig::from_value(value).unwrap();
        assert_eq!(config.input_config.config, json!({}));
    }

    #[test]
    fn test_missing_required_fields_reported_together() {
        let errors = validate_train_task_config(&json!({}));
        assert_eq!(fields(&errors), vec!["num_epochs", "output_directory", "input_config"]);
    }

    #[test]
    fn test_wrong_types_rejected() {
        let errors = validate_train_task_config(&json!({
            "num_epochs": "two",
            "output_directory": 7,
            "input_config": {"classname": "", "config": []},
            "save_steps": 0,
        }));
        let got = fields(&errors);
        assert!(got.contains(&"num_epochs"));
        assert!(got.contains(&"output_directory"));
        assert!(got.contains(&"save_steps"));
        assert!(got.contains(&"input_config.classname"));
        assert!(got.contains(&"input_config.config"));
    }

    #[test]
    fn test_negative_and_fractional_epochs_rejected() {
        let mut value = valid();
        value["num_epochs"] = json!(-1);
        assert_eq!(validate_train_task_config(&value)[0].message, "must be >= 1");

        value["num_epochs"] = json!(1.5);
        assert_eq!(validate_train_task_config(&value)[0].message, "must be an integer");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let mut value = valid();
        value["learning_rate"] = json!(0.1);
        value["input_config"]["extra"] = json!(true);
        let errors = validate_train_task_config(&value);
        assert_eq!(fields(&errors), vec!["learning_rate", "input_config.extra"]);
    }

    #[test]
    fn test_from_value_returns_validation_error() {
        let err = TrainTaskConfig::from_value(json!({"num_epochs": 1})).unwrap_err();
        match err {
            TaskError::Validation(errors) => assert_eq!(errors.0.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_object_root_rejected() {
        let errors = validate_train_task_config(&json!([1, 2]));
        assert_eq!(fields(&errors), vec!["<root>"]);
    }

    #[test]
    fn test_load_config_file_toml_and_json() {
        let temp = TempDir::new().unwrap();
        let toml_path = temp.path().join("task.toml");
        std::fs::write(
            &toml_path,
            r#"
num_epochs = 3
output_directory = "out"

[input_config]
classname = "pkg.MockInput"

[input_config.config]
size = 4
"#,
        )
        .unwrap();
        let value = load_config_file(&toml_path).unwrap();
        let config = TrainTaskConfig::from_value(value).unwrap();
        assert_eq!(config.num_epochs, 3);
        assert_eq!(config.input_config.config["size"], json!(4));

        let json_path = temp.path().join("task.json");
        std::fs::write(&json_path, serde_json::to_string(&valid()).unwrap()).unwrap();
        assert_eq!(load_config_file(&json_path).unwrap(), valid());
    }
}
