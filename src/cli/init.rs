//! Init command - write a starter config file

use anyhow::{Context, Result};
use console::style;

use crate::config::{CONFIG_FILE_NAME, EXAMPLE_CONFIG};

/// Run the init command
pub fn run() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);
    if path.exists() {
        println!(
            "{} {} already exists, leaving it alone",
            style("✓").green(),
            style(CONFIG_FILE_NAME).cyan()
        );
        return Ok(());
    }

    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("failed to write {CONFIG_FILE_NAME}"))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(CONFIG_FILE_NAME).cyan()
    );
    println!("\nNext steps:");
    println!("  {} Analyze a file", style("pymend analyze script.py").cyan());
    println!("  {} Repair a file", style("pymend fix script.py").cyan());
    Ok(())
}
