use crate::dataset::Dataset;
use crate::error::TaskResult;

/// Builds the dataset a task consumes.
///
/// Providers are constructed from their configuration blob through the
/// [`Registry`](crate::registry::Registry), used once to produce a dataset,
/// then dropped.
pub trait InputProvider: Send {
    fn get_dataset(&self) -> TaskResult<Box<dyn Dataset>>;
}
