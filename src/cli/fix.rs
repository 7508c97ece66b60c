//! Fix command - write the repaired source to a file

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;

use crate::config::AnalyzerConfig;
use crate::pipeline;

/// Run the fix command
pub fn run(input: &Path, output: Option<&Path>, config: AnalyzerConfig) -> Result<()> {
    let source = super::read_input(input)?;
    let report = pipeline::analyze(&source, &config);

    // stdin input with no explicit output goes to stdout
    let target = match (output, input == Path::new("-")) {
        (Some(path), _) => Some(path.to_path_buf()),
        (None, true) => None,
        (None, false) => Some(default_output_path(input)),
    };

    match target {
        Some(path) => {
            std::fs::write(&path, &report.corrected_code)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "{} Wrote {} ({} change{} applied)",
                style("✓").green(),
                style(path.display()).cyan(),
                report.changes_applied,
                if report.changes_applied == 1 { "" } else { "s" }
            );
        }
        None => print!("{}", report.corrected_code),
    }

    if !report.parse_ok {
        eprintln!(
            "{} Source could not be fully repaired; output is best effort",
            style("!").yellow()
        );
    }
    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    input.with_file_name(format!("{stem}_fixed.py"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_adds_fixed_suffix() {
        assert_eq!(
            default_output_path(Path::new("dir/script.py")),
            PathBuf::from("dir/script_fixed.py")
        );
        assert_eq!(
            default_output_path(Path::new("script.py")),
            PathBuf::from("script_fixed.py")
        );
    }
}
