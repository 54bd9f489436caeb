//! Tasks: configured units of work run against a model.

use crate::checkpoint::{latest_checkpoint, Saver};
use crate::config::{validate_train_task_config, ObjectConfiguration, TrainTaskConfig};
use crate::dataset::Dataset;
use crate::error::{TaskError, TaskResult, ValidationErrors};
use crate::model::{Model, ModelMode, ModelOutputs};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::registry::Registry;
use crate::session::{Session, StepOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub const TRAIN_TASK_CLASSNAME: &str = "eoflow.tasks.TrainTask";

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub epochs_completed: u64,
    /// Training steps executed across all epochs.
    pub steps: u64,
    pub global_step: Option<u64>,
    pub last_loss: Option<f64>,
    pub checkpoints: Vec<PathBuf>,
}

impl RunSummary {
    fn new(run_id: Uuid) -> Self {
        Self { run_id, epochs_completed: 0, steps: 0, global_step: None, last_loss: None, checkpoints: Vec::new() }
    }
}

pub trait Task: Send {
    fn name(&self) -> &str;

    fn run(&mut self, progress: &dyn ProgressSink) -> TaskResult<RunSummary>;
}

/// Trains a model for a fixed number of epochs over a configured input,
/// checkpointing every `save_steps` global steps.
pub struct TrainTask {
    config: TrainTaskConfig,
    model: Box<dyn Model>,
    registry: Arc<Registry>,
}

impl fmt::Debug for TrainTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainTask")
            .field("config", &self.config)
            .field("model", &self.model.name())
            .finish_non_exhaustive()
    }
}

impl TrainTask {
    /// Build a task from an already typed configuration. The configuration is
    /// checked against the same schema as untyped input.
    pub fn new(config: TrainTaskConfig, model: Box<dyn Model>, registry: Arc<Registry>) -> TaskResult<Self> {
        ValidationErrors(validate_train_task_config(&serde_json::to_value(&config)?)).into_result()?;
        Ok(Self { config, model, registry })
    }

    /// Validate an untyped configuration and build the task.
    pub fn from_value(config: Value, model: Box<dyn Model>, registry: Arc<Registry>) -> TaskResult<Self> {
        let config = TrainTaskConfig::from_value(config)?;
        Ok(Self { config, model, registry })
    }

    #[must_use]
    pub fn config(&self) -> &TrainTaskConfig {
        &self.config
    }

    /// Resolve the configured input class, construct it and build its dataset.
    pub fn parse_input(&self) -> TaskResult<Box<dyn Dataset>> {
        let ObjectConfiguration { classname, config } = &self.config.input_config;
        let constructor = self.registry.resolve_input(classname)?;
        let input = constructor(config)?;
        debug!(input = %classname, "Constructed input provider");
        input.get_dataset()
    }
}

/// Refuse to start when the index already records a checkpoint beyond
/// `start_step`. The save cadence would collide with it mid-run.
fn ensure_no_later_checkpoints(output_directory: &Path, start_step: u64) -> TaskResult<()> {
    match latest_checkpoint(output_directory)? {
        Some(entry) if entry.global_step > start_step => Err(TaskError::Checkpoint(format!(
            "{} already holds checkpoints up to step {}, training would start at step {start_step}",
            output_directory.display(),
            entry.global_step
        ))),
        _ => Ok(()),
    }
}

impl Task for TrainTask {
    fn name(&self) -> &str {
        TRAIN_TASK_CLASSNAME
    }

    fn run(&mut self, progress: &dyn ProgressSink) -> TaskResult<RunSummary> {
        let run_id = Uuid::new_v4();
        let mut session = Session::open();

        let mut dataset = self.parse_input()?;
        let spec = dataset.element_spec();

        let ModelOutputs { mut train_op, summaries } = self.model.build_model(&spec, ModelMode::Train)?;
        debug!(model = %self.model.name(), ?summaries, "Built training graph");

        let saver = Saver::for_output_dir(&self.config.output_directory);
        session.initialize_variables(train_op.as_mut())?;
        ensure_no_later_checkpoints(&self.config.output_directory, train_op.global_step())?;

        info!(
            %run_id,
            session_id = %session.id(),
            model = %self.model.name(),
            num_epochs = self.config.num_epochs,
            save_steps = self.config.save_steps,
            checkpoint_prefix = %saver.layout().checkpoint_prefix().display(),
            "Starting training"
        );

        let mut summary = RunSummary::new(run_id);
        for epoch in 0..self.config.num_epochs {
            session.initialize_iterator(dataset.as_mut())?;

            loop {
                let output = match session.run_step(train_op.as_mut(), dataset.as_mut())? {
                    StepOutcome::Completed(output) => output,
                    StepOutcome::Exhausted => break,
                };
                summary.steps += 1;
                summary.global_step = Some(output.global_step);
                summary.last_loss = Some(output.loss);

                let step = output.global_step;
                if step % self.config.save_steps == 0 {
                    info!(step, "Saving checkpoint at step {step}");
                    let path = saver.save(self.model.name(), train_op.as_ref(), step)?;
                    progress.on_event(ProgressEvent::CheckpointSaved { run_id, step, path: path.clone() });
                    summary.checkpoints.push(path);
                }

                // TODO: write output.summaries to <output_directory>/summaries once a summary writer exists.
            }

            summary.epochs_completed += 1;
            debug!(epoch, steps = summary.steps, "Epoch finished");
        }

        Ok(summary)
    }
}
