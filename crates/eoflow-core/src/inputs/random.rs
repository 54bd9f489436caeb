//! Seeded synthetic regression data.

use crate::config::parse_class_config;
use crate::dataset::{Dataset, Example, InMemoryDataset};
use crate::error::{FieldError, TaskResult, ValidationErrors};
use crate::input::InputProvider;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CLASSNAME: &str = "eoflow.input.RandomRegressionInput";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RandomRegressionInputConfig {
    pub num_examples: usize,
    pub num_features: usize,
    pub batch_size: usize,
    /// Amplitude of uniform label noise.
    pub noise: f32,
    pub seed: u64,
    pub shuffle: bool,
}

impl Default for RandomRegressionInputConfig {
    fn default() -> Self {
        Self { num_examples: 256, num_features: 4, batch_size: 32, noise: 0.01, seed: 42, shuffle: false }
    }
}

impl RandomRegressionInputConfig {
    pub fn validate(&self) -> TaskResult<()> {
        let mut errors = Vec::new();
        if self.num_examples == 0 {
            errors.push(FieldError::new("input_config.config.num_examples", "must be >= 1"));
        }
        if self.num_features == 0 {
            errors.push(FieldError::new("input_config.config.num_features", "must be >= 1"));
        }
        if self.batch_size == 0 {
            errors.push(FieldError::new("input_config.config.batch_size", "must be >= 1"));
        }
        if !self.noise.is_finite() || self.noise < 0.0 {
            errors.push(FieldError::new("input_config.config.noise", "must be >= 0"));
        }
        ValidationErrors(errors).into_result()
    }
}

/// Generates `y = w·x + b + noise` with `w` and `b` drawn from the seed.
#[derive(Debug, Clone)]
pub struct RandomRegressionInput {
    config: RandomRegressionInputConfig,
}

impl RandomRegressionInput {
    pub fn new(config: RandomRegressionInputConfig) -> TaskResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn from_config(config: &Value) -> TaskResult<Self> {
        Self::new(parse_class_config(config, "input_config.config")?)
    }

    fn generate(&self) -> Vec<Example> {
        let cfg = &self.config;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let weights: Vec<f32> = (0..cfg.num_features).map(|_| rng.gen_range(-1.0..=1.0)).collect();
        let bias: f32 = rng.gen_range(-1.0..=1.0);

        (0..cfg.num_examples)
            .map(|_| {
                let features: Vec<f32> = (0..cfg.num_features).map(|_| rng.gen_range(-1.0..=1.0)).collect();
                let noise = if cfg.noise > 0.0 { rng.gen_range(-cfg.noise..=cfg.noise) } else { 0.0 };
                let label = weights.iter().zip(&features).map(|(w, x)| w * x).sum::<f32>() + bias + noise;
                Example { features, label }
            })
            .collect()
    }
}

impl InputProvider for RandomRegressionInput {
    fn get_dataset(&self) -> TaskResult<Box<dyn Dataset>> {
        let mut dataset = InMemoryDataset::new(self.generate(), self.config.batch_size)?;
        if self.config.shuffle {
            dataset = dataset.with_shuffle(self.config.seed);
        }
        Ok(Box::new(dataset))
    }
}
