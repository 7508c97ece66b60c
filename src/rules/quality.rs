//! Code-quality rules: unreachable branches and unused imports

use rustpython_parser::ast::{Ranged, Stmt, Suite};

use crate::models::{Diagnostic, Severity};
use crate::rules::{walk, Rule, RuleContext, CODE_UNREACHABLE_BRANCH, CODE_UNUSED_IMPORT};

/// Conditionals whose test is the literal constant `False`
pub struct UnreachableBranch;

impl Rule for UnreachableBranch {
    fn check(&self, suite: &Suite, ctx: &RuleContext) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        walk::visit_stmts(suite, &mut |stmt| {
            if let Stmt::If(if_stmt) = stmt {
                if walk::is_false_constant(&if_stmt.test) {
                    diagnostics.push(Diagnostic::new(
                        Severity::Warning,
                        CODE_UNREACHABLE_BRANCH,
                        ctx.line_of(if_stmt.range.start().into()),
                        "Unreachable branch: condition is always False",
                    ));
                }
            }
        });
        diagnostics
    }
}

/// Imported bindings never observed as read anywhere in the tree.
///
/// Two-pass by construction: the read-name set comes from the context's
/// whole-tree pre-pass, so a reference inside any nested scope keeps the
/// import alive.
pub struct UnusedImport;

impl Rule for UnusedImport {
    fn check(&self, suite: &Suite, ctx: &RuleContext) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        walk::visit_stmts(suite, &mut |stmt| {
            let bindings = match stmt {
                Stmt::Import(import) => import
                    .names
                    .iter()
                    .map(|alias| {
                        super::import_binding_name(
                            alias.asname.as_ref().map(|a| a.as_str()),
                            alias.name.as_str(),
                        )
                    })
                    .collect::<Vec<_>>(),
                Stmt::ImportFrom(import) => import
                    .names
                    .iter()
                    .map(|alias| {
                        super::import_binding_name(
                            alias.asname.as_ref().map(|a| a.as_str()),
                            alias.name.as_str(),
                        )
                    })
                    .collect(),
                _ => return,
            };
            let line = ctx.line_of(stmt.range().start().into());
            for name in bindings {
                // wildcard imports bind nothing trackable
                if name == "*" {
                    continue;
                }
                if !ctx.read_names.contains(&name) {
                    diagnostics.push(Diagnostic::new(
                        Severity::Info,
                        CODE_UNUSED_IMPORT,
                        line,
                        format!("Unused import '{name}'"),
                    ));
                }
            }
        });
        diagnostics
    }
}
