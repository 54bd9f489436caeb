//! Command implementations.

pub mod checkpoints;
pub mod classes;
pub mod run;
pub mod validate;
