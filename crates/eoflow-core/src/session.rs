use crate::dataset::{Dataset, Fetch};
use crate::error::TaskResult;
use crate::model::TrainOp;
use std::collections::BTreeMap;
use tracing::{debug, trace};
use uuid::Uuid;

/// Values read back after one training step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub loss: f64,
    pub global_step: u64,
    pub summaries: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Completed(StepOutput),
    /// The dataset ran out of batches for the current epoch.
    Exhausted,
}

/// Execution context for one run.
///
/// Opened at the start of a run and released when dropped, which happens on
/// every exit path including errors. Every call blocks until the underlying
/// computation completes.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    steps_run: u64,
}

impl Session {
    #[must_use]
    pub fn open() -> Self {
        let id = Uuid::new_v4();
        debug!(session_id = %id, "Opened session");
        Self { id, steps_run: 0 }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of training steps executed in this session.
    #[must_use]
    pub fn steps_run(&self) -> u64 {
        self.steps_run
    }

    pub fn initialize_variables(&mut self, op: &mut dyn TrainOp) -> TaskResult<()> {
        trace!(session_id = %self.id, "Initializing variables");
        op.initialize()
    }

    pub fn initialize_iterator(&mut self, dataset: &mut dyn Dataset) -> TaskResult<()> {
        trace!(session_id = %self.id, "Initializing dataset iterator");
        dataset.initialize()
    }

    /// Pull the next batch and run `op` on it, reading loss and global step
    /// from the same execution.
    pub fn run_step(&mut self, op: &mut dyn TrainOp, dataset: &mut dyn Dataset) -> TaskResult<StepOutcome> {
        let batch = match dataset.next_batch()? {
            Fetch::Batch(batch) => batch,
            Fetch::Exhausted => return Ok(StepOutcome::Exhausted),
        };

        let metrics = op.run(&batch)?;
        self.steps_run += 1;
        Ok(StepOutcome::Completed(StepOutput {
            loss: metrics.loss,
            global_step: op.global_step(),
            summaries: metrics.summaries,
        }))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!(session_id = %self.id, steps_run = self.steps_run, "Closed session");
    }
}
