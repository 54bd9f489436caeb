//! eoflow CLI - runs declaratively configured training tasks.
//!
//! The `eoflow` command loads a `{model, task}` configuration file, resolves
//! the named classes from the built-in registry and executes the task.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// eoflow - declarative training task runner
#[derive(Parser, Debug)]
#[command(name = "eoflow", author, version, about = "eoflow - declarative training task runner")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a task configuration
    ///
    /// Loads a JSON or TOML document with `model` and `task` sections,
    /// resolves both classes and runs the task to completion. Prints one
    /// line per saved checkpoint.
    ///
    /// Checkpoints are never overwritten: running again into an output
    /// directory that already holds later checkpoints fails before training.
    Run {
        /// Path to the configuration file
        config: PathBuf,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a task configuration without running it
    Validate {
        /// Path to the configuration file
        config: PathBuf,
    },

    /// List registered input, model and task classes
    Classes {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List checkpoints written to an output directory
    Checkpoints {
        /// The task's output directory
        output_directory: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Re-read every checkpoint file and check it against its recorded digest
        #[arg(long)]
        verify: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so `--json` output on stdout stays parseable.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Run { config, json } => commands::run::execute(config, json).await,
        Command::Validate { config } => commands::validate::execute(&config),
        Command::Classes { json } => commands::classes::execute(json),
        Command::Checkpoints { output_directory, json, verify } => {
            commands::checkpoints::execute(&output_directory, json, verify)
        }
    }
}
