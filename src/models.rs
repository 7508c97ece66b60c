//! Core data models for pymend
//!
//! These types are threaded through every stage of the pipeline:
//! repair actions, syntax faults, diagnostics, and rewrite audit records.

use serde::{Deserialize, Serialize};

/// Severity levels for diagnostics, ordered `info < warning < danger < critical`.
///
/// The ordering is used for display sorting and downstream confidence
/// scoring. A distinct `error` finding type exists only at the boundary,
/// reserved for unrecoverable parse failures (see [`crate::pipeline`]).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Danger,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Danger => write!(f, "danger"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A single observation about the analyzed source.
///
/// `code` is a stable short identifier (SEC001, QLT001, ...) forming a
/// taxonomy independent of message text, so findings stay machine-filterable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        code: impl Into<String>,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            line,
            message: message.into(),
        }
    }
}

/// Summary of diagnostics by severity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsSummary {
    pub critical: usize,
    pub danger: usize,
    pub warning: usize,
    pub info: usize,
    pub total: usize,
}

impl DiagnosticsSummary {
    pub fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        let mut summary = Self::default();
        for d in diagnostics {
            match d.severity {
                Severity::Critical => summary.critical += 1,
                Severity::Danger => summary.danger += 1,
                Severity::Warning => summary.warning += 1,
                Severity::Info => summary.info += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

/// The kind of heuristic edit a repair action performed.
///
/// Shared between the normalizer (textual passes) and the repair loop
/// (fault-targeted fixes): the normalizer's missing-colon rule and the
/// loop's missing-block-terminator fix are the same kind of edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepairKind {
    TabExpansion,
    LiteralTranslation,
    MissingBlockTerminator,
    UnterminatedString,
    UnbalancedBracket,
    BadIndentation,
}

/// Audit record of one heuristic edit, accumulated in insertion order.
///
/// Never mutated after creation. The number of repair actions plus the
/// rewrite change count is the sole contract for "how much was changed".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairAction {
    pub kind: RepairKind,
    pub line: usize,
    pub description: String,
    /// Heuristic confidence in [0, 1]
    pub confidence: f64,
}

impl RepairAction {
    pub fn new(kind: RepairKind, line: usize, description: impl Into<String>, confidence: f64) -> Self {
        Self {
            kind,
            line,
            description: description.into(),
            confidence,
        }
    }
}

/// Closed set of syntax fault categories the repair loop can address.
///
/// Unclassified faults stop the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultKind {
    MissingBlockTerminator,
    UnterminatedString,
    UnbalancedBracket,
    BadIndentation,
    LiteralTokenMismatch,
    Unclassified,
}

/// A parse failure: the faulting line plus the parser's message.
///
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxFault {
    pub line: usize,
    pub message: String,
}

/// The kind of structural rewrite applied to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewriteKind {
    InsertDocstring,
    PruneDeadBranch,
    NormalizeCasing,
    DropUnusedImport,
}

/// Audit record of one structural rewrite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteChange {
    pub kind: RewriteKind,
    pub line: usize,
    pub description: String,
}

impl RewriteChange {
    pub fn new(kind: RewriteKind, line: usize, description: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            description: description.into(),
        }
    }
}
