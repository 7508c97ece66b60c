//! CLI command definitions and handlers

mod analyze;
mod fix;
mod init;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pymend - best-effort Python source repair and analysis
#[derive(Parser, Debug)]
#[command(name = "pymend")]
#[command(
    version,
    about = "Repair mangled Python source, flag risky patterns, and apply safe structural rewrites",
    long_about = "Pymend takes Python source that may not even parse, applies bounded \
heuristic repairs (missing colons, unterminated strings, unbalanced brackets, broken \
indentation, foreign literals), then analyzes the repaired module for security, \
quality, and style findings and applies deterministic structural rewrites.\n\n\
Analysis never fails: unrecoverable input yields an error finding plus the best \
text produced so far.",
    after_help = "\
Examples:
  pymend analyze script.py                 Analyze a file, text report
  pymend analyze script.py --format json   JSON output for scripting
  cat script.py | pymend analyze -         Read source from stdin
  pymend fix script.py                     Write repaired source to script_fixed.py
  pymend fix script.py -o clean.py         Write repaired source to clean.py
  pymend init                              Write a starter pymend.toml"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Path to a pymend.toml config file (default: ./pymend.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a Python file and report findings
    Analyze {
        /// Input file, or '-' for stdin
        input: PathBuf,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Attach LLM commentary to the report (needs an API key)
        #[arg(long)]
        semantic: bool,
    },

    /// Repair a Python file and write the corrected source
    Fix {
        /// Input file, or '-' for stdin
        input: PathBuf,

        /// Output path (default: <stem>_fixed.py, or stdout for stdin input)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Write a starter pymend.toml in the current directory
    Init,
}

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let config = crate::config::load_config(cli.config.as_deref());
    match cli.command {
        Commands::Analyze {
            input,
            format,
            semantic,
        } => analyze::run(&input, &format, semantic, config),
        Commands::Fix { input, output } => fix::run(&input, output.as_deref(), config),
        Commands::Init => init::run(),
    }
}

/// Read the input source, treating "-" as stdin
pub(crate) fn read_input(input: &std::path::Path) -> Result<String> {
    use anyhow::Context;
    if input == std::path::Path::new("-") {
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)
            .context("failed to read from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))
    }
}
