//! Analyze command - run the pipeline and print a report

use std::path::Path;

use anyhow::Result;

use crate::config::AnalyzerConfig;
use crate::pipeline;
use crate::reporters;

/// Run the analyze command
pub fn run(input: &Path, format: &str, semantic: bool, mut config: AnalyzerConfig) -> Result<()> {
    if semantic {
        config.semantic.enabled = true;
    }

    let source = super::read_input(input)?;
    let report = pipeline::analyze(&source, &config);

    let rendered = match format {
        "json" => reporters::render_json(&report)?,
        _ => reporters::render_text(&report)?,
    };
    println!("{rendered}");

    Ok(())
}
