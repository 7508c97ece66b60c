//! pymend - best-effort Python source repair and static analysis
//!
//! The pipeline runs in a fixed order: normalize raw text, repair syntax
//! until it parses (or the attempt budget runs out), walk the tree for
//! findings, apply deterministic structural rewrites, then hand the result
//! to optional external collaborators (formatter, import sorter, LLM
//! commentary). Every stage is fail-open: the pipeline always returns some
//! text plus an exact count of the changes it made.

pub mod cli;
pub mod collab;
pub mod config;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod repair;
pub mod reporters;
pub mod rewrite;
pub mod rules;
pub mod source;

pub use config::AnalyzerConfig;
pub use models::{Diagnostic, RepairAction, RepairKind, Severity, SyntaxFault};
pub use pipeline::{analyze, analyze_request, AnalysisReport, AnalyzeRequest, AnalyzeResponse};
