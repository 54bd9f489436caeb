//! `eoflow checkpoints`: inspect an output directory.

use anyhow::{Context, Result};
use colored::Colorize;
use eoflow_core::{list_checkpoints, read_checkpoint, CheckpointEntry};
use std::path::Path;

/// Read back every checkpoint and check its sha256 against the index.
fn verify_all(entries: &[CheckpointEntry]) -> Result<()> {
    for entry in entries {
        let file = read_checkpoint(&entry.path, Some(entry))
            .with_context(|| format!("Checkpoint at step {} failed verification", entry.global_step))?;
        anyhow::ensure!(
            file.global_step == entry.global_step,
            "{} records step {}, index says {}",
            entry.path.display(),
            file.global_step,
            entry.global_step
        );
    }
    Ok(())
}

pub fn execute(output_directory: &Path, json_output: bool, verify: bool) -> Result<()> {
    let entries = list_checkpoints(output_directory)
        .with_context(|| format!("Failed to read checkpoints in {}", output_directory.display()))?;

    if verify {
        verify_all(&entries)?;
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Checkpoints ({})", entries.len()).bold().cyan());
    println!();

    if entries.is_empty() {
        println!("  {}", "No checkpoints found in this output directory.".dimmed());
        println!();
        return Ok(());
    }

    println!("{:<12} {:<26} {}", "Step", "Created", "Path");
    println!("{}", "─".repeat(90));
    for entry in &entries {
        println!(
            "{:<12} {:<26} {}",
            entry.global_step.to_string().cyan(),
            entry.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            entry.path.display().to_string().dimmed()
        );
    }
    if verify {
        println!();
        println!("{} {}", "✓".green(), format!("{} checkpoints verified", entries.len()).bold());
    }
    println!();
    Ok(())
}
