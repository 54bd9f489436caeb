//! Built-in input providers.

pub mod jsonl;
pub mod random;

pub use jsonl::{JsonlInput, JsonlInputConfig};
pub use random::{RandomRegressionInput, RandomRegressionInputConfig};
