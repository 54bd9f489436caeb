//! eoflow core
//!
//! Declaratively configured training tasks:
//! - Validating task configuration (`TrainTaskConfig`, `ExecutionConfig`)
//! - Resolving input providers, models and tasks by class name (`Registry`)
//! - Driving epoch-bounded training inside an execution `Session`
//! - Writing step-tagged checkpoints (`Saver`)

pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod error;
pub mod input;
pub mod inputs;
pub mod layout;
pub mod model;
pub mod models;
pub mod progress;
pub mod registry;
pub mod runner;
pub mod session;
pub mod task;

pub use checkpoint::{latest_checkpoint, list_checkpoints, read_checkpoint, CheckpointEntry, CheckpointFile, Saver};
pub use config::{load_config_file, validate_train_task_config, ObjectConfiguration, TrainTaskConfig};
pub use dataset::{Batch, Dataset, ElementSpec, Example, Fetch, InMemoryDataset};
pub use error::{FieldError, TaskError, TaskResult, ValidationErrors};
pub use input::InputProvider;
pub use layout::OutputLayout;
pub use model::{Model, ModelMode, ModelOutputs, StepMetrics, TrainOp};
pub use progress::{NoopProgressSink, ProgressEvent, ProgressSink, RecordingProgressSink, StdoutProgressSink};
pub use registry::{ClassInfo, ClassKind, Registry};
pub use runner::{execute, validate_execution_config, ExecutionConfig};
pub use session::{Session, StepOutcome, StepOutput};
pub use task::{RunSummary, Task, TrainTask, TRAIN_TASK_CLASSNAME};
