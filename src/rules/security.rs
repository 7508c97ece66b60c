//! Security rules: dangerous calls and dangerous module usage

use std::collections::HashSet;

use rustpython_parser::ast::{Expr, Ranged, Suite};

use crate::models::{Diagnostic, Severity};
use crate::rules::{walk, Rule, RuleContext, CODE_DANGEROUS_CALL, CODE_DANGEROUS_MODULE};

/// Calls to dynamic-execution primitives (eval, exec, ...).
///
/// A literal first argument is merely suspicious (`warning`); anything
/// dynamic reaching a dynamic-execution primitive is the worst case
/// (`critical`).
pub struct DangerousCall {
    functions: HashSet<String>,
}

impl DangerousCall {
    pub fn new(functions: &[String]) -> Self {
        Self {
            functions: functions.iter().cloned().collect(),
        }
    }

    fn call_target<'a>(func: &'a Expr) -> Option<&'a str> {
        match func {
            Expr::Name(name) => Some(name.id.as_str()),
            Expr::Attribute(attr) => Some(attr.attr.as_str()),
            _ => None,
        }
    }
}

impl Rule for DangerousCall {
    fn check(&self, suite: &Suite, ctx: &RuleContext) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        walk::visit_stmts(suite, &mut |stmt| {
            walk::visit_stmt_exprs(stmt, &mut |expr| {
                let Expr::Call(call) = expr else {
                    return;
                };
                let Some(target) = Self::call_target(&call.func) else {
                    return;
                };
                if !self.functions.contains(target) {
                    return;
                }
                let literal_input = matches!(call.args.first(), Some(Expr::Constant(_)));
                let dynamic = !call.args.is_empty() && !literal_input;
                let (severity, input) = if dynamic {
                    (Severity::Critical, "dynamic")
                } else {
                    (Severity::Warning, "literal")
                };
                diagnostics.push(Diagnostic::new(
                    severity,
                    CODE_DANGEROUS_CALL,
                    ctx.line_of(call.range.start().into()),
                    format!("Call to '{target}' with {input} input"),
                ));
            });
        });
        diagnostics
    }
}

/// Attribute access on names bound to a dangerous module
pub struct DangerousModule {
    modules: HashSet<String>,
}

impl DangerousModule {
    pub fn new(modules: &[String]) -> Self {
        Self {
            modules: modules.iter().cloned().collect(),
        }
    }
}

impl Rule for DangerousModule {
    fn check(&self, suite: &Suite, ctx: &RuleContext) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        walk::visit_stmts(suite, &mut |stmt| {
            walk::visit_stmt_exprs(stmt, &mut |expr| {
                let Expr::Attribute(attr) = expr else {
                    return;
                };
                let Expr::Name(base) = &*attr.value else {
                    return;
                };
                let Some(module) = ctx.imports.get(base.id.as_str()) else {
                    return;
                };
                if self.modules.contains(module) {
                    diagnostics.push(Diagnostic::new(
                        Severity::Danger,
                        CODE_DANGEROUS_MODULE,
                        ctx.line_of(attr.range.start().into()),
                        format!("Use of dangerous module '{module}'"),
                    ));
                }
            });
        });
        diagnostics
    }
}
