//! Built-in models.

pub mod linear;

pub use linear::{LinearRegressionConfig, LinearRegressionModel, LinearState};
