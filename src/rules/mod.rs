//! Diagnostic rules over the parsed tree
//!
//! A single read-only traversal per rule; rules compose and none depends on
//! mutation by another. Shared analysis state (import map, read-name set,
//! line index) is built once per pass in [`RuleContext`] and discarded
//! after use.

pub mod quality;
pub mod security;
pub mod style;
pub mod walk;

use std::collections::HashSet;

use indexmap::IndexMap;
use line_numbers::LinePositions;
use rustpython_parser::ast::{Expr, ExprContext, Stmt, Suite};

use crate::config::RulesConfig;
use crate::models::Diagnostic;

pub use quality::{UnreachableBranch, UnusedImport};
pub use security::{DangerousCall, DangerousModule};
pub use style::{ExcessiveParameters, MissingDocstring};

/// Stable finding codes
pub const CODE_DANGEROUS_CALL: &str = "SEC001";
pub const CODE_DANGEROUS_MODULE: &str = "SEC002";
pub const CODE_UNREACHABLE_BRANCH: &str = "QLT001";
pub const CODE_UNUSED_IMPORT: &str = "QLT002";
pub const CODE_MISSING_DOCSTRING: &str = "STL001";
pub const CODE_EXCESSIVE_PARAMETERS: &str = "STL002";
pub const CODE_SYNTAX_ERROR: &str = "SYN001";
pub const CODE_COLLABORATOR_FAILURE: &str = "EXT001";

/// Trait for diagnostic rules that check AST patterns
pub trait Rule {
    fn check(&self, suite: &Suite, ctx: &RuleContext) -> Vec<Diagnostic>;
}

/// Transient per-pass analysis state: import bindings, names observed as
/// read, and the offset-to-line index.
pub struct RuleContext {
    /// Locally bound import alias (or dotted module path) to module name,
    /// in source order
    pub imports: IndexMap<String, String>,
    /// Identifier names read anywhere in the tree (load context)
    pub read_names: HashSet<String>,
    lines: LinePositions,
}

impl RuleContext {
    /// Single pre-pass over the tree: collect import bindings and every
    /// identifier read.
    pub fn build(suite: &Suite, source: &str) -> Self {
        let mut imports = IndexMap::new();
        let mut read_names = HashSet::new();

        walk::visit_stmts(suite, &mut |stmt| {
            match stmt {
                Stmt::Import(import) => {
                    for alias in &import.names {
                        let key = alias
                            .asname
                            .as_ref()
                            .map(|a| a.to_string())
                            .unwrap_or_else(|| alias.name.to_string());
                        imports.insert(key, alias.name.to_string());
                    }
                }
                Stmt::ImportFrom(import) => {
                    for alias in &import.names {
                        let key = alias
                            .asname
                            .as_ref()
                            .map(|a| a.to_string())
                            .unwrap_or_else(|| alias.name.to_string());
                        if let Some(module) = &import.module {
                            imports.insert(key, module.to_string());
                        }
                    }
                }
                _ => {}
            }
            walk::visit_stmt_exprs(stmt, &mut |expr| {
                if let Expr::Name(name) = expr {
                    if matches!(name.ctx, ExprContext::Load) {
                        read_names.insert(name.id.to_string());
                    }
                }
            });
        });

        Self {
            imports,
            read_names,
            lines: LinePositions::from(source),
        }
    }

    /// 1-based line for a byte offset
    pub fn line_of(&self, offset: usize) -> usize {
        self.lines.from_offset(offset).as_usize() + 1
    }
}

/// Name an import statement actually binds in the local scope.
///
/// `import os.path` binds `os`, not `os.path`; `from x import y as z`
/// binds `z`. Wildcard imports bind nothing trackable.
pub fn import_binding_name(asname: Option<&str>, name: &str) -> String {
    match asname {
        Some(a) => a.to_string(),
        None => name.split('.').next().unwrap_or(name).to_string(),
    }
}

/// Runs every configured rule over one tree and ranks the output
pub struct DiagnosticEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl DiagnosticEngine {
    pub fn from_config(config: &RulesConfig) -> Self {
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(DangerousCall::new(&config.critical_functions)),
            Box::new(DangerousModule::new(&config.dangerous_modules)),
            Box::new(UnreachableBranch),
            Box::new(MissingDocstring),
            Box::new(ExcessiveParameters {
                threshold: config.max_parameters,
            }),
            Box::new(UnusedImport),
        ];
        Self { rules }
    }

    /// Diagnostics sorted by line ascending, then severity descending
    pub fn run(&self, suite: &Suite, ctx: &RuleContext) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> = self
            .rules
            .iter()
            .flat_map(|rule| rule.check(suite, ctx))
            .collect();
        diagnostics.sort_by(|a, b| a.line.cmp(&b.line).then(b.severity.cmp(&a.severity)));
        diagnostics
    }
}
