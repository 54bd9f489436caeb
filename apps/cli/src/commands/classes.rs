//! `eoflow classes`: list the registry.

use anyhow::Result;
use colored::Colorize;
use eoflow_core::Registry;

pub fn execute(json_output: bool) -> Result<()> {
    let classes = Registry::with_builtins().list();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&classes)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Registered Classes ({})", classes.len()).bold().cyan());
    println!();
    println!("{:<44} {}", "Class", "Kind");
    println!("{}", "─".repeat(64));
    for class in classes {
        println!("{:<44} {}", class.name.cyan(), class.kind.to_string().dimmed());
    }
    println!();
    Ok(())
}
