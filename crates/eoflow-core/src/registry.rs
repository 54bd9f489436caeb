//! Class registry: resolves fully-qualified class names to constructors.
//!
//! Registration happens at process start; afterwards the registry is shared
//! read-only (usually behind an `Arc`). A lookup either yields a constructor
//! of the requested kind, fails with [`TaskError::TypeResolution`] for an
//! unknown name, or with [`TaskError::ContractViolation`] when the name is
//! registered as a different kind of class.

use crate::error::{TaskError, TaskResult};
use crate::input::InputProvider;
use crate::inputs::{jsonl, random, JsonlInput, RandomRegressionInput};
use crate::model::Model;
use crate::models::{linear, LinearRegressionModel};
use crate::task::{Task, TrainTask, TRAIN_TASK_CLASSNAME};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

pub type InputConstructor = Arc<dyn Fn(&Value) -> TaskResult<Box<dyn InputProvider>> + Send + Sync>;
pub type ModelConstructor = Arc<dyn Fn(&Value) -> TaskResult<Box<dyn Model>> + Send + Sync>;
pub type TaskConstructor =
    Arc<dyn Fn(Value, Box<dyn Model>, Arc<Registry>) -> TaskResult<Box<dyn Task>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    Input,
    Model,
    Task,
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Input => "input provider",
            Self::Model => "model",
            Self::Task => "task",
        };
        f.write_str(s)
    }
}

#[derive(Clone)]
enum Registered {
    Input(InputConstructor),
    Model(ModelConstructor),
    Task(TaskConstructor),
}

impl Registered {
    fn kind(&self) -> ClassKind {
        match self {
            Self::Input(_) => ClassKind::Input,
            Self::Model(_) => ClassKind::Model,
            Self::Task(_) => ClassKind::Task,
        }
    }
}

/// Metadata about a registered class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub kind: ClassKind,
}

#[derive(Default)]
pub struct Registry {
    classes: HashMap<String, Registered>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("class_count", &self.classes.len()).finish_non_exhaustive()
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in inputs, models and tasks.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_input(random::CLASSNAME, |config| {
            Ok(Box::new(RandomRegressionInput::from_config(config)?) as Box<dyn InputProvider>)
        });
        registry.register_input(jsonl::CLASSNAME, |config| {
            Ok(Box::new(JsonlInput::from_config(config)?) as Box<dyn InputProvider>)
        });
        registry.register_model(linear::CLASSNAME, |config| {
            Ok(Box::new(LinearRegressionModel::from_config(config)?) as Box<dyn Model>)
        });
        registry.register_task(TRAIN_TASK_CLASSNAME, |config, model, classes| {
            Ok(Box::new(TrainTask::from_value(config, model, classes)?) as Box<dyn Task>)
        });
        registry
    }

    fn insert(&mut self, name: &str, class: Registered) -> bool {
        debug!(class = %name, kind = %class.kind(), "Registering class");
        let replaced = self.classes.insert(name.to_string(), class).is_some();
        if replaced {
            warn!(class = %name, "Class replaced in registry");
        }
        !replaced
    }

    /// Returns `true` if the name was newly registered, `false` if it replaced
    /// an existing class.
    pub fn register_input<F>(&mut self, name: &str, constructor: F) -> bool
    where
        F: Fn(&Value) -> TaskResult<Box<dyn InputProvider>> + Send + Sync + 'static,
    {
        self.insert(name, Registered::Input(Arc::new(constructor)))
    }

    pub fn register_model<F>(&mut self, name: &str, constructor: F) -> bool
    where
        F: Fn(&Value) -> TaskResult<Box<dyn Model>> + Send + Sync + 'static,
    {
        self.insert(name, Registered::Model(Arc::new(constructor)))
    }

    pub fn register_task<F>(&mut self, name: &str, constructor: F) -> bool
    where
        F: Fn(Value, Box<dyn Model>, Arc<Registry>) -> TaskResult<Box<dyn Task>> + Send + Sync + 'static,
    {
        self.insert(name, Registered::Task(Arc::new(constructor)))
    }

    fn lookup(&self, name: &str) -> TaskResult<&Registered> {
        self.classes.get(name).ok_or_else(|| TaskError::TypeResolution { classname: name.to_string() })
    }

    pub fn resolve_input(&self, name: &str) -> TaskResult<InputConstructor> {
        match self.lookup(name)? {
            Registered::Input(ctor) => Ok(Arc::clone(ctor)),
            other => Err(mismatch(name, ClassKind::Input, other)),
        }
    }

    pub fn resolve_model(&self, name: &str) -> TaskResult<ModelConstructor> {
        match self.lookup(name)? {
            Registered::Model(ctor) => Ok(Arc::clone(ctor)),
            other => Err(mismatch(name, ClassKind::Model, other)),
        }
    }

    pub fn resolve_task(&self, name: &str) -> TaskResult<TaskConstructor> {
        match self.lookup(name)? {
            Registered::Task(ctor) => Ok(Arc::clone(ctor)),
            other => Err(mismatch(name, ClassKind::Task, other)),
        }
    }

    /// All registered classes, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<ClassInfo> {
        let mut out: Vec<ClassInfo> =
            self.classes.iter().map(|(name, class)| ClassInfo { name: name.clone(), kind: class.kind() }).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

fn mismatch(name: &str, expected: ClassKind, found: &Registered) -> TaskError {
    TaskError::ContractViolation { classname: name.to_string(), expected, found: found.kind() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtins_are_listed() {
        let registry = Registry::with_builtins();
        let names: Vec<String> = registry.list().into_iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                "eoflow.input.JsonlInput",
                "eoflow.input.RandomRegressionInput",
                "eoflow.models.LinearRegressionModel",
                "eoflow.tasks.TrainTask",
            ]
        );
    }

    #[test]
    fn test_unknown_name_is_type_resolution_error() {
        let registry = Registry::with_builtins();
        let err = registry.resolve_input("pkg.DoesNotExist").err().unwrap();
        assert!(matches!(err, TaskError::TypeResolution { classname } if classname == "pkg.DoesNotExist"));
    }

    #[test]
    fn test_wrong_kind_is_contract_violation() {
        let registry = Registry::with_builtins();
        let err = registry.resolve_input(linear::CLASSNAME).err().unwrap();
        assert!(matches!(
            err,
            TaskError::ContractViolation { expected: ClassKind::Input, found: ClassKind::Model, .. }
        ));
        assert!(registry.resolve_model(random::CLASSNAME).is_err());
        assert!(registry.resolve_task(linear::CLASSNAME).is_err());
    }

    #[test]
    fn test_register_replaces_existing() {
        fn ctor(config: &Value) -> TaskResult<Box<dyn InputProvider>> {
            Ok(Box::new(RandomRegressionInput::from_config(config)?))
        }

        let mut registry = Registry::new();
        assert!(registry.register_input("pkg.Input", ctor));
        assert!(!registry.register_input("pkg.Input", ctor));
        assert_eq!(registry.list(), vec![ClassInfo { name: "pkg.Input".to_string(), kind: ClassKind::Input }]);
    }

    #[test]
    fn test_resolved_constructor_builds_input() {
        let registry = Registry::with_builtins();
        let ctor = registry.resolve_input(random::CLASSNAME).unwrap();
        let input = ctor(&json!({"num_examples": 4, "num_features": 2})).unwrap();
        assert_eq!(input.get_dataset().unwrap().element_spec().num_features, 2);
    }
}
