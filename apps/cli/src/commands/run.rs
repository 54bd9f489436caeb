//! `eoflow run`: execute a configuration file.
//!
//! Human mode prints one line per saved checkpoint and nothing else. `--json`
//! prints only the final run summary.

use anyhow::{Context, Result};
use eoflow_core::{load_config_file, runner, NoopProgressSink, ProgressSink, Registry, StdoutProgressSink};
use std::path::PathBuf;
use std::sync::Arc;

pub async fn execute(config: PathBuf, json_output: bool) -> Result<()> {
    let value = load_config_file(&config).with_context(|| format!("Failed to load {}", config.display()))?;
    let registry = Arc::new(Registry::with_builtins());

    // Training blocks for its whole duration; keep it off the async workers.
    let summary = tokio::task::spawn_blocking(move || {
        let progress: &dyn ProgressSink = if json_output { &NoopProgressSink } else { &StdoutProgressSink };
        runner::execute(value, &registry, progress)
    })
    .await
    .context("Training thread panicked")?
    .context("Training failed")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
