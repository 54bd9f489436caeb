use crate::error::{TaskError, TaskResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// One labelled example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub features: Vec<f32>,
    pub label: f32,
}

/// A batch of `(features, labels)` pairs produced by a dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<f32>,
}

impl Batch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Shape information a model builds against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub num_features: usize,
}

/// Result of asking a dataset for its next batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    Batch(Batch),
    /// The sequence is consumed for this epoch. Not an error.
    Exhausted,
}

/// A restartable, lazily consumed sequence of batches.
pub trait Dataset: Send {
    fn element_spec(&self) -> ElementSpec;

    /// Re-arm the sequence from its start. Must be called before the first
    /// `next_batch` of every epoch.
    fn initialize(&mut self) -> TaskResult<()>;

    fn next_batch(&mut self) -> TaskResult<Fetch>;
}

/// A dataset backed by examples held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    examples: Vec<Example>,
    batch_size: usize,
    num_features: usize,
    shuffle_seed: Option<u64>,
    order: Vec<usize>,
    cursor: usize,
    epoch: u64,
    initialized: bool,
}

impl InMemoryDataset {
    /// Build a dataset; every example must have the same feature width.
    pub fn new(examples: Vec<Example>, batch_size: usize) -> TaskResult<Self> {
        if batch_size == 0 {
            return Err(TaskError::validation("batch_size", "must be >= 1"));
        }
        let num_features = examples.first().map_or(0, |ex| ex.features.len());
        if let Some(idx) = examples.iter().position(|ex| ex.features.len() != num_features) {
            return Err(TaskError::Execution(format!(
                "example[{idx}] has {} features, expected {num_features}",
                examples[idx].features.len()
            )));
        }

        Ok(Self {
            order: (0..examples.len()).collect(),
            examples,
            batch_size,
            num_features,
            shuffle_seed: None,
            cursor: 0,
            epoch: 0,
            initialized: false,
        })
    }

    /// Reshuffle example order on every `initialize`, deterministically per epoch.
    #[must_use]
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }
}

impl Dataset for InMemoryDataset {
    fn element_spec(&self) -> ElementSpec {
        ElementSpec { num_features: self.num_features }
    }

    fn initialize(&mut self) -> TaskResult<()> {
        self.order = (0..self.examples.len()).collect();
        if let Some(seed) = self.shuffle_seed {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(self.epoch));
            self.order.shuffle(&mut rng);
        }
        self.cursor = 0;
        self.epoch += 1;
        self.initialized = true;
        Ok(())
    }

    fn next_batch(&mut self) -> TaskResult<Fetch> {
        if !self.initialized {
            return Err(TaskError::Execution("dataset iterator has not been initialized".to_string()));
        }
        if self.cursor >= self.order.len() {
            return Ok(Fetch::Exhausted);
        }

        let end = (self.cursor + self.batch_size).min(self.order.len());
        let mut batch = Batch::default();
        for &idx in &self.order[self.cursor..end] {
            let ex = &self.examples[idx];
            batch.features.push(ex.features.clone());
            batch.labels.push(ex.label);
        }
        self.cursor = end;
        Ok(Fetch::Batch(batch))
    }
}
