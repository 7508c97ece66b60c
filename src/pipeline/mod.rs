//! Pipeline orchestration
//!
//! Fixed stage order: normalize, repair, diagnose, rewrite, collaborators,
//! optional semantic commentary. Later stages only run when the source
//! parses; on an unrecoverable parse failure the pipeline fails open with
//! a single `error` finding and the best text produced so far.
//!
//! Structural rewrites are verified by re-parsing their output. A rewrite
//! that breaks the parse is discarded wholesale and the pre-rewrite text
//! is kept. Collaborator failures never block the run; they surface as
//! warning findings.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collab::{ExternalTool, SemanticClient};
use crate::config::AnalyzerConfig;
use crate::models::{
    Diagnostic, DiagnosticsSummary, RepairAction, RewriteChange, Severity, SyntaxFault,
};
use crate::normalize::Normalizer;
use crate::repair::{self, parse_module};
use crate::rewrite::RewriteEngine;
use crate::rules::{DiagnosticEngine, RuleContext, CODE_COLLABORATOR_FAILURE, CODE_SYNTAX_ERROR};

/// Wire finding type reserved for unrecoverable parse failures
const FINDING_TYPE_ERROR: &str = "error";

/// One analysis request: raw source, however mangled
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub code: String,
}

/// One finding on the wire. `type` is a severity word, or `error` for a
/// parse failure that survived repair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: String,
    pub line: usize,
    pub message: String,
}

impl Finding {
    fn from_diagnostic(d: &Diagnostic) -> Self {
        Self {
            kind: d.severity.to_string(),
            code: d.code.clone(),
            line: d.line,
            message: d.message.clone(),
        }
    }

    fn parse_failure(fault: &SyntaxFault) -> Self {
        Self {
            kind: FINDING_TYPE_ERROR.to_string(),
            code: CODE_SYNTAX_ERROR.to_string(),
            line: fault.line,
            message: format!("Syntax error: {}", fault.message),
        }
    }

    fn collaborator(name: &str, error: &dyn std::fmt::Display) -> Self {
        Self {
            kind: Severity::Warning.to_string(),
            code: CODE_COLLABORATOR_FAILURE.to_string(),
            line: 0,
            message: format!("Collaborator '{name}' failed: {error}"),
        }
    }
}

/// Response shape for reporters and callers
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub findings: Vec<Finding>,
    pub corrected_code: String,
    pub changes_applied: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic: Option<String>,
}

/// Full analysis output, including the audit trail the wire shape omits
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub findings: Vec<Finding>,
    pub corrected_code: String,
    pub changes_applied: usize,
    pub repair_actions: Vec<RepairAction>,
    pub rewrite_log: Vec<RewriteChange>,
    pub summary: DiagnosticsSummary,
    pub parse_ok: bool,
    pub semantic: Option<String>,
}

impl AnalysisReport {
    pub fn to_response(&self) -> AnalyzeResponse {
        AnalyzeResponse {
            findings: self.findings.clone(),
            corrected_code: self.corrected_code.clone(),
            changes_applied: self.changes_applied,
            semantic: self.semantic.clone(),
        }
    }
}

/// Convenience for JSON callers: run the pipeline over a request body
pub fn analyze_request(request: &AnalyzeRequest, config: &AnalyzerConfig) -> AnalyzeResponse {
    analyze(&request.code, config).to_response()
}

/// Run the whole pipeline over one source buffer
pub fn analyze(source: &str, config: &AnalyzerConfig) -> AnalysisReport {
    let normalizer = Normalizer::new(&config.repair);
    let (normalized, norm_actions) = normalizer.normalize(source);
    debug!(actions = norm_actions.len(), "normalization complete");

    let outcome = repair::repair(&normalized, config);
    let mut repair_actions = norm_actions;
    repair_actions.extend(outcome.actions.iter().cloned());
    let mut changes_applied = repair_actions.len();

    if !outcome.success {
        let fault = outcome.fault.unwrap_or(SyntaxFault {
            line: 1,
            message: "unknown parse failure".to_string(),
        });
        info!(line = fault.line, "analysis stopped at parse failure");
        return AnalysisReport {
            findings: vec![Finding::parse_failure(&fault)],
            corrected_code: outcome.text,
            changes_applied,
            repair_actions,
            rewrite_log: Vec::new(),
            summary: DiagnosticsSummary::default(),
            parse_ok: false,
            semantic: None,
        };
    }

    let mut text = outcome.text;
    // repair just verified this parse
    let suite = match parse_module(&text) {
        Ok(suite) => suite,
        Err(fault) => {
            return AnalysisReport {
                findings: vec![Finding::parse_failure(&fault)],
                corrected_code: text,
                changes_applied,
                repair_actions,
                rewrite_log: Vec::new(),
                summary: DiagnosticsSummary::default(),
                parse_ok: false,
                semantic: None,
            };
        }
    };

    let ctx = RuleContext::build(&suite, &text);
    let diagnostics = DiagnosticEngine::from_config(&config.rules).run(&suite, &ctx);
    let summary = DiagnosticsSummary::from_diagnostics(&diagnostics);
    let mut findings: Vec<Finding> = diagnostics.iter().map(Finding::from_diagnostic).collect();

    let mut rewrite_log = Vec::new();
    match RewriteEngine::new(&config.rewrite).rewrite(&suite, &text, &ctx) {
        Ok(result) => {
            if parse_module(&result.source).is_ok() {
                text = result.source;
                changes_applied += result.change_count;
                rewrite_log = result.log;
            } else {
                warn!("rewrite output failed to parse, keeping pre-rewrite text");
            }
        }
        Err(e) => warn!("rewrite pass failed: {e}"),
    }

    run_collaborators(config, &mut text, &mut findings);

    let semantic = if config.semantic.enabled {
        run_semantic(config, &text, &mut findings)
    } else {
        None
    };

    info!(
        findings = findings.len(),
        changes_applied, "analysis complete"
    );
    AnalysisReport {
        findings,
        corrected_code: text,
        changes_applied,
        repair_actions,
        rewrite_log,
        summary,
        parse_ok: true,
        semantic,
    }
}

/// Pipe the corrected source through the configured formatter and import
/// sorter, in that order. Output that fails to parse is rejected.
fn run_collaborators(config: &AnalyzerConfig, text: &mut String, findings: &mut Vec<Finding>) {
    let timeout = config.collaborators.timeout_secs;
    let tools = [
        ("formatter", &config.collaborators.formatter),
        ("import_sorter", &config.collaborators.import_sorter),
    ];
    for (name, argv) in tools {
        let Some(tool) = ExternalTool::from_argv(argv, timeout) else {
            continue;
        };
        match tool.run(text) {
            Ok(output) => {
                if parse_module(&output).is_ok() {
                    debug!(tool = name, "collaborator output accepted");
                    *text = output;
                } else {
                    warn!(tool = name, "collaborator produced unparseable output");
                    findings.push(Finding::collaborator(
                        tool.command_name(),
                        &"output did not parse",
                    ));
                }
            }
            Err(e) => {
                warn!(tool = name, error = %e, "collaborator failed");
                findings.push(Finding::collaborator(tool.command_name(), &e));
            }
        }
    }
}

fn run_semantic(
    config: &AnalyzerConfig,
    text: &str,
    findings: &mut Vec<Finding>,
) -> Option<String> {
    let client = match SemanticClient::from_config(&config.semantic) {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "semantic backend unavailable");
            findings.push(Finding::collaborator("semantic", &e));
            return None;
        }
    };
    match client.describe(text) {
        Ok(commentary) => Some(commentary),
        Err(e) => {
            warn!(error = %e, "semantic commentary failed");
            findings.push(Finding::collaborator("semantic", &e));
            None
        }
    }
}
