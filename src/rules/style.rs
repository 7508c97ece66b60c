//! Style rules: missing docstrings and oversized parameter lists

use rustpython_parser::ast::{Stmt, Suite};

use crate::models::{Diagnostic, Severity};
use crate::rules::{walk, Rule, RuleContext, CODE_EXCESSIVE_PARAMETERS, CODE_MISSING_DOCSTRING};

/// Function definitions with no leading documentation statement
pub struct MissingDocstring;

impl Rule for MissingDocstring {
    fn check(&self, suite: &Suite, ctx: &RuleContext) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        walk::visit_stmts(suite, &mut |stmt| {
            let (name, body, offset) = match stmt {
                Stmt::FunctionDef(f) => (&f.name, &f.body, f.range.start()),
                Stmt::AsyncFunctionDef(f) => (&f.name, &f.body, f.range.start()),
                _ => return,
            };
            if !walk::has_docstring(body) {
                diagnostics.push(Diagnostic::new(
                    Severity::Info,
                    CODE_MISSING_DOCSTRING,
                    ctx.line_of(offset.into()),
                    format!("Function '{name}' has no docstring"),
                ));
            }
        });
        diagnostics
    }
}

/// Function definitions with too many positional parameters
pub struct ExcessiveParameters {
    pub threshold: usize,
}

impl Rule for ExcessiveParameters {
    fn check(&self, suite: &Suite, ctx: &RuleContext) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        walk::visit_stmts(suite, &mut |stmt| {
            let (name, args, offset) = match stmt {
                Stmt::FunctionDef(f) => (&f.name, &f.args, f.range.start()),
                Stmt::AsyncFunctionDef(f) => (&f.name, &f.args, f.range.start()),
                _ => return,
            };
            let count = args.posonlyargs.len() + args.args.len();
            if count > self.threshold {
                diagnostics.push(Diagnostic::new(
                    Severity::Warning,
                    CODE_EXCESSIVE_PARAMETERS,
                    ctx.line_of(offset.into()),
                    format!(
                        "Function '{name}' has {count} positional parameters (max {})",
                        self.threshold
                    ),
                ));
            }
        });
        diagnostics
    }
}
