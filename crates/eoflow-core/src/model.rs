use crate::dataset::{Batch, ElementSpec};
use crate::error::TaskResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Mode a model graph is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelMode {
    Train,
    Eval,
    Predict,
}

impl fmt::Display for ModelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Train => "train",
            Self::Eval => "eval",
            Self::Predict => "predict",
        };
        f.write_str(s)
    }
}

/// Scalars reported by one execution of a training operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepMetrics {
    pub loss: f64,
    pub summaries: BTreeMap<String, f64>,
}

/// A built, executable training operation together with the state it owns.
pub trait TrainOp: Send {
    /// Initialize all variables. Runs once per session before the first step.
    fn initialize(&mut self) -> TaskResult<()>;

    /// Execute one step on `batch`. Advancing the global step is a side
    /// effect of this call.
    fn run(&mut self, batch: &Batch) -> TaskResult<StepMetrics>;

    /// Current global step. Read by the task after every `run`.
    fn global_step(&self) -> u64;

    /// Serializable snapshot of the trainable state.
    fn save_state(&self) -> TaskResult<serde_json::Value>;
}

/// Everything `Model::build_model` hands back to a task.
pub struct ModelOutputs {
    pub train_op: Box<dyn TrainOp>,
    /// Names of the summary scalars each step reports.
    pub summaries: Vec<String>,
}

impl fmt::Debug for ModelOutputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelOutputs")
            .field("global_step", &self.train_op.global_step())
            .field("summaries", &self.summaries)
            .finish_non_exhaustive()
    }
}

/// A trainable model. Its global step counter is exposed through the
/// [`TrainOp`] returned by `build_model`, since that op owns the state.
pub trait Model: Send {
    fn name(&self) -> &str;

    fn build_model(&mut self, spec: &ElementSpec, mode: ModelMode) -> TaskResult<ModelOutputs>;
}
