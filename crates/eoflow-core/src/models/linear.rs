//! Linear regression trained with mini-batch SGD on mean squared error.

use crate::config::parse_class_config;
use crate::dataset::{Batch, ElementSpec};
use crate::error::{TaskError, TaskResult};
use crate::model::{Model, ModelMode, ModelOutputs, StepMetrics, TrainOp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

pub const CLASSNAME: &str = "eoflow.models.LinearRegressionModel";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearRegressionConfig {
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
}

fn default_learning_rate() -> f64 {
    0.01
}

impl Default for LinearRegressionConfig {
    fn default() -> Self {
        Self { learning_rate: default_learning_rate() }
    }
}

#[derive(Debug, Clone)]
pub struct LinearRegressionModel {
    config: LinearRegressionConfig,
}

impl LinearRegressionModel {
    pub fn new(config: LinearRegressionConfig) -> TaskResult<Self> {
        if !config.learning_rate.is_finite() || config.learning_rate <= 0.0 {
            return Err(TaskError::validation("model.config.learning_rate", "must be > 0"));
        }
        Ok(Self { config })
    }

    /// Registry constructor.
    pub fn from_config(config: &Value) -> TaskResult<Self> {
        Self::new(parse_class_config(config, "model.config")?)
    }
}

impl Model for LinearRegressionModel {
    fn name(&self) -> &str {
        CLASSNAME
    }

    fn build_model(&mut self, spec: &ElementSpec, mode: ModelMode) -> TaskResult<ModelOutputs> {
        if mode == ModelMode::Predict {
            return Err(TaskError::Execution(format!("{CLASSNAME} cannot build a {mode} graph")));
        }
        if spec.num_features == 0 {
            return Err(TaskError::Execution("input provides no features".to_string()));
        }

        debug!(num_features = spec.num_features, %mode, "Building linear regression graph");
        let op = LinearTrainOp {
            learning_rate: self.config.learning_rate,
            update: mode == ModelMode::Train,
            state: LinearState { weights: vec![0.0; spec.num_features], bias: 0.0, global_step: 0 },
        };

        Ok(ModelOutputs {
            train_op: Box::new(op),
            summaries: vec!["loss".to_string(), "weight_norm".to_string()],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearState {
    pub weights: Vec<f64>,
    pub bias: f64,
    pub global_step: u64,
}

#[derive(Debug)]
struct LinearTrainOp {
    learning_rate: f64,
    update: bool,
    state: LinearState,
}

impl LinearTrainOp {
    fn predict(&self, features: &[f32]) -> f64 {
        self.state.weights.iter().zip(features).map(|(w, x)| w * f64::from(*x)).sum::<f64>() + self.state.bias
    }
}

impl TrainOp for LinearTrainOp {
    fn initialize(&mut self) -> TaskResult<()> {
        self.state.weights.iter_mut().for_each(|w| *w = 0.0);
        self.state.bias = 0.0;
        self.state.global_step = 0;
        Ok(())
    }

    fn run(&mut self, batch: &Batch) -> TaskResult<StepMetrics> {
        if batch.is_empty() {
            return Err(TaskError::Execution("received an empty batch".to_string()));
        }
        let n = self.state.weights.len();
        if let Some(row) = batch.features.iter().find(|row| row.len() != n) {
            return Err(TaskError::Execution(format!("batch row has {} features, graph expects {n}", row.len())));
        }

        let count = batch.len() as f64;
        let mut loss = 0.0;
        let mut grad_w = vec![0.0; n];
        let mut grad_b = 0.0;
        for (row, label) in batch.features.iter().zip(&batch.labels) {
            let err = self.predict(row) - f64::from(*label);
            loss += err * err;
            for (g, x) in grad_w.iter_mut().zip(row) {
                *g += 2.0 * err * f64::from(*x);
            }
            grad_b += 2.0 * err;
        }
        loss /= count;

        if !loss.is_finite() {
            return Err(TaskError::Execution(format!("loss diverged at step {}", self.state.global_step)));
        }

        if self.update {
            for (w, g) in self.state.weights.iter_mut().zip(&grad_w) {
                *w -= self.learning_rate * g / count;
            }
            self.state.bias -= self.learning_rate * grad_b / count;
            self.state.global_step += 1;
        }

        let weight_norm = self.state.weights.iter().map(|w| w * w).sum::<f64>().sqrt();
        let summaries = BTreeMap::from([("loss".to_string(), loss), ("weight_norm".to_string(), weight_norm)]);
        Ok(StepMetrics { loss, summaries })
    }

    fn global_step(&self) -> u64 {
        self.state.global_step
    }

    fn save_state(&self) -> TaskResult<Value> {
        Ok(serde_json::to_value(&self.state)?)
    }
}
