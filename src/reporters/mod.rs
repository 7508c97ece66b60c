//! Output rendering: terminal text and machine-readable JSON

use anyhow::Result;

use crate::pipeline::AnalysisReport;

/// Reset ANSI color
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Severity colors (ANSI escape codes)
fn finding_color(kind: &str) -> &'static str {
    match kind {
        "error" | "critical" => "\x1b[31m", // Red
        "danger" => "\x1b[91m",             // Light red
        "warning" => "\x1b[33m",            // Yellow
        "info" => "\x1b[90m",               // Gray
        _ => "\x1b[0m",
    }
}

fn finding_tag(kind: &str) -> &'static str {
    match kind {
        "error" => "[E]",
        "critical" => "[C]",
        "danger" => "[D]",
        "warning" => "[W]",
        "info" => "[I]",
        _ => "[?]",
    }
}

/// Render a report as formatted terminal output
pub fn render_text(report: &AnalysisReport) -> Result<String> {
    let mut out = String::new();

    out.push_str(&format!("\n{BOLD}Pymend Analysis{RESET}\n"));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    out.push_str(&format!(
        "Findings: {BOLD}{}{RESET}  Changes applied: {BOLD}{}{RESET}\n",
        report.findings.len(),
        report.changes_applied
    ));

    let s = &report.summary;
    let mut summary_parts = Vec::new();
    if s.critical > 0 {
        summary_parts.push(format!("\x1b[31m{} critical{RESET}", s.critical));
    }
    if s.danger > 0 {
        summary_parts.push(format!("\x1b[91m{} danger{RESET}", s.danger));
    }
    if s.warning > 0 {
        summary_parts.push(format!("\x1b[33m{} warning{RESET}", s.warning));
    }
    if s.info > 0 {
        summary_parts.push(format!("\x1b[90m{} info{RESET}", s.info));
    }
    if !summary_parts.is_empty() {
        out.push_str(&format!("  {}\n", summary_parts.join(" | ")));
    }
    out.push('\n');

    if !report.findings.is_empty() {
        out.push_str(&format!("{DIM}  SEV   CODE    LINE  MESSAGE{RESET}\n"));
        out.push_str(&format!(
            "{DIM}  ───────────────────────────────────────────────{RESET}\n"
        ));
        for finding in &report.findings {
            let color = finding_color(&finding.kind);
            let tag = finding_tag(&finding.kind);
            out.push_str(&format!(
                "  {color}{tag}{RESET}   {:<7} {:>4}  {}\n",
                finding.code, finding.line, finding.message
            ));
        }
        out.push('\n');
    }

    if !report.repair_actions.is_empty() {
        out.push_str(&format!("{BOLD}REPAIRS{RESET}\n"));
        for action in &report.repair_actions {
            out.push_str(&format!(
                "  line {:>4}  {} {DIM}(confidence {:.1}){RESET}\n",
                action.line, action.description, action.confidence
            ));
        }
        out.push('\n');
    }

    if !report.rewrite_log.is_empty() {
        out.push_str(&format!("{BOLD}REWRITES{RESET}\n"));
        for change in &report.rewrite_log {
            out.push_str(&format!("  line {:>4}  {}\n", change.line, change.description));
        }
        out.push('\n');
    }

    if let Some(commentary) = &report.semantic {
        out.push_str(&format!("{BOLD}COMMENTARY{RESET}\n"));
        for line in commentary.lines() {
            out.push_str(&format!("  {line}\n"));
        }
        out.push('\n');
    }

    if !report.parse_ok {
        out.push_str(&format!(
            "\x1b[31m{BOLD}Source could not be fully repaired; output is best effort.{RESET}\n"
        ));
    }

    Ok(out)
}

/// Render the wire response as pretty-printed JSON
pub fn render_json(report: &AnalysisReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(&report.to_response())?)
}
