//! Recursive AST traversal helpers
//!
//! Rules are pure functions over the tree; these walkers give them a
//! uniform pre-order view of every statement and expression, including
//! nested bodies, so no rule needs its own recursion boilerplate.

use rustpython_parser::ast::{Constant, ExceptHandler, Expr, Stmt};

/// Visit every statement in pre-order, descending into nested bodies
pub fn visit_stmts<'a>(stmts: &'a [Stmt], f: &mut dyn FnMut(&'a Stmt)) {
    for stmt in stmts {
        f(stmt);
        for body in child_bodies(stmt) {
            visit_stmts(body, f);
        }
    }
}

/// Child statement suites of a compound statement
pub fn child_bodies<'a>(stmt: &'a Stmt) -> Vec<&'a [Stmt]> {
    match stmt {
        Stmt::FunctionDef(s) => vec![s.body.as_slice()],
        Stmt::AsyncFunctionDef(s) => vec![s.body.as_slice()],
        Stmt::ClassDef(s) => vec![s.body.as_slice()],
        Stmt::If(s) => vec![s.body.as_slice(), s.orelse.as_slice()],
        Stmt::While(s) => vec![s.body.as_slice(), s.orelse.as_slice()],
        Stmt::For(s) => vec![s.body.as_slice(), s.orelse.as_slice()],
        Stmt::AsyncFor(s) => vec![s.body.as_slice(), s.orelse.as_slice()],
        Stmt::With(s) => vec![s.body.as_slice()],
        Stmt::AsyncWith(s) => vec![s.body.as_slice()],
        Stmt::Try(s) => {
            let mut bodies = vec![s.body.as_slice(), s.orelse.as_slice(), s.finalbody.as_slice()];
            for handler in &s.handlers {
                let ExceptHandler::ExceptHandler(h) = handler;
                bodies.push(h.body.as_slice());
            }
            bodies
        }
        Stmt::TryStar(s) => {
            let mut bodies = vec![s.body.as_slice(), s.orelse.as_slice(), s.finalbody.as_slice()];
            for handler in &s.handlers {
                let ExceptHandler::ExceptHandler(h) = handler;
                bodies.push(h.body.as_slice());
            }
            bodies
        }
        Stmt::Match(s) => s.cases.iter().map(|c| c.body.as_slice()).collect(),
        _ => Vec::new(),
    }
}

/// Visit every expression directly attached to a statement, recursively.
///
/// Does not descend into nested statement bodies; pair with [`visit_stmts`]
/// to cover a whole tree.
pub fn visit_stmt_exprs<'a>(stmt: &'a Stmt, f: &mut dyn FnMut(&'a Expr)) {
    let mut go = |expr: &'a Expr| visit_expr(expr, f);
    match stmt {
        Stmt::FunctionDef(s) => {
            for d in &s.decorator_list {
                visit_expr(d, f);
            }
            visit_arguments(&s.args, f);
            if let Some(r) = &s.returns {
                visit_expr(r, f);
            }
        }
        Stmt::AsyncFunctionDef(s) => {
            for d in &s.decorator_list {
                visit_expr(d, f);
            }
            visit_arguments(&s.args, f);
            if let Some(r) = &s.returns {
                visit_expr(r, f);
            }
        }
        Stmt::ClassDef(s) => {
            for b in &s.bases {
                visit_expr(b, f);
            }
            for k in &s.keywords {
                visit_expr(&k.value, f);
            }
            for d in &s.decorator_list {
                visit_expr(d, f);
            }
        }
        Stmt::Return(s) => {
            if let Some(v) = &s.value {
                go(v);
            }
        }
        Stmt::Delete(s) => {
            for t in &s.targets {
                go(t);
            }
        }
        Stmt::Assign(s) => {
            for t in &s.targets {
                go(t);
            }
            go(&s.value);
        }
        Stmt::AugAssign(s) => {
            go(&s.target);
            go(&s.value);
        }
        Stmt::AnnAssign(s) => {
            go(&s.target);
            go(&s.annotation);
            if let Some(v) = &s.value {
                go(v);
            }
        }
        Stmt::For(s) => {
            go(&s.target);
            go(&s.iter);
        }
        Stmt::AsyncFor(s) => {
            go(&s.target);
            go(&s.iter);
        }
        Stmt::While(s) => go(&s.test),
        Stmt::If(s) => go(&s.test),
        Stmt::With(s) => {
            for item in &s.items {
                visit_expr(&item.context_expr, f);
                if let Some(v) = &item.optional_vars {
                    visit_expr(v, f);
                }
            }
        }
        Stmt::AsyncWith(s) => {
            for item in &s.items {
                visit_expr(&item.context_expr, f);
                if let Some(v) = &item.optional_vars {
                    visit_expr(v, f);
                }
            }
        }
        Stmt::Match(s) => {
            go(&s.subject);
            for case in &s.cases {
                if let Some(g) = &case.guard {
                    visit_expr(g, f);
                }
            }
        }
        Stmt::Raise(s) => {
            if let Some(e) = &s.exc {
                go(e);
            }
            if let Some(c) = &s.cause {
                go(c);
            }
        }
        Stmt::Try(s) => {
            for handler in &s.handlers {
                let ExceptHandler::ExceptHandler(h) = handler;
                if let Some(t) = &h.type_ {
                    visit_expr(t, f);
                }
            }
        }
        Stmt::TryStar(s) => {
            for handler in &s.handlers {
                let ExceptHandler::ExceptHandler(h) = handler;
                if let Some(t) = &h.type_ {
                    visit_expr(t, f);
                }
            }
        }
        Stmt::Assert(s) => {
            go(&s.test);
            if let Some(m) = &s.msg {
                go(m);
            }
        }
        Stmt::Expr(s) => go(&s.value),
        _ => {}
    }
}

fn visit_arguments<'a>(
    args: &'a rustpython_parser::ast::Arguments,
    f: &mut dyn FnMut(&'a Expr),
) {
    for arg in args
        .posonlyargs
        .iter()
        .chain(&args.args)
        .chain(&args.kwonlyargs)
    {
        if let Some(annotation) = &arg.def.annotation {
            visit_expr(annotation, f);
        }
        if let Some(default) = &arg.default {
            visit_expr(default, f);
        }
    }
    if let Some(vararg) = &args.vararg {
        if let Some(annotation) = &vararg.annotation {
            visit_expr(annotation, f);
        }
    }
    if let Some(kwarg) = &args.kwarg {
        if let Some(annotation) = &kwarg.annotation {
            visit_expr(annotation, f);
        }
    }
}

/// Visit an expression and all sub-expressions in pre-order
pub fn visit_expr<'a>(expr: &'a Expr, f: &mut dyn FnMut(&'a Expr)) {
    f(expr);
    match expr {
        Expr::BoolOp(e) => {
            for v in &e.values {
                visit_expr(v, f);
            }
        }
        Expr::NamedExpr(e) => {
            visit_expr(&e.target, f);
            visit_expr(&e.value, f);
        }
        Expr::BinOp(e) => {
            visit_expr(&e.left, f);
            visit_expr(&e.right, f);
        }
        Expr::UnaryOp(e) => visit_expr(&e.operand, f),
        Expr::Lambda(e) => {
            visit_arguments(&e.args, f);
            visit_expr(&e.body, f);
        }
        Expr::IfExp(e) => {
            visit_expr(&e.test, f);
            visit_expr(&e.body, f);
            visit_expr(&e.orelse, f);
        }
        Expr::Dict(e) => {
            for k in e.keys.iter().flatten() {
                visit_expr(k, f);
            }
            for v in &e.values {
                visit_expr(v, f);
            }
        }
        Expr::Set(e) => {
            for v in &e.elts {
                visit_expr(v, f);
            }
        }
        Expr::ListComp(e) => {
            visit_expr(&e.elt, f);
            visit_comprehensions(&e.generators, f);
        }
        Expr::SetComp(e) => {
            visit_expr(&e.elt, f);
            visit_comprehensions(&e.generators, f);
        }
        Expr::DictComp(e) => {
            visit_expr(&e.key, f);
            visit_expr(&e.value, f);
            visit_comprehensions(&e.generators, f);
        }
        Expr::GeneratorExp(e) => {
            visit_expr(&e.elt, f);
            visit_comprehensions(&e.generators, f);
        }
        Expr::Await(e) => visit_expr(&e.value, f),
        Expr::Yield(e) => {
            if let Some(v) = &e.value {
                visit_expr(v, f);
            }
        }
        Expr::YieldFrom(e) => visit_expr(&e.value, f),
        Expr::Compare(e) => {
            visit_expr(&e.left, f);
            for c in &e.comparators {
                visit_expr(c, f);
            }
        }
        Expr::Call(e) => {
            visit_expr(&e.func, f);
            for a in &e.args {
                visit_expr(a, f);
            }
            for k in &e.keywords {
                visit_expr(&k.value, f);
            }
        }
        Expr::FormattedValue(e) => {
            visit_expr(&e.value, f);
            if let Some(spec) = &e.format_spec {
                visit_expr(spec, f);
            }
        }
        Expr::JoinedStr(e) => {
            for v in &e.values {
                visit_expr(v, f);
            }
        }
        Expr::Attribute(e) => visit_expr(&e.value, f),
        Expr::Subscript(e) => {
            visit_expr(&e.value, f);
            visit_expr(&e.slice, f);
        }
        Expr::Starred(e) => visit_expr(&e.value, f),
        Expr::List(e) => {
            for v in &e.elts {
                visit_expr(v, f);
            }
        }
        Expr::Tuple(e) => {
            for v in &e.elts {
                visit_expr(v, f);
            }
        }
        Expr::Slice(e) => {
            if let Some(l) = &e.lower {
                visit_expr(l, f);
            }
            if let Some(u) = &e.upper {
                visit_expr(u, f);
            }
            if let Some(s) = &e.step {
                visit_expr(s, f);
            }
        }
        _ => {}
    }
}

fn visit_comprehensions<'a>(
    generators: &'a [rustpython_parser::ast::Comprehension],
    f: &mut dyn FnMut(&'a Expr),
) {
    for gen in generators {
        visit_expr(&gen.target, f);
        visit_expr(&gen.iter, f);
        for cond in &gen.ifs {
            visit_expr(cond, f);
        }
    }
}

/// True if the expression is the literal constant `False`
pub fn is_false_constant(expr: &Expr) -> bool {
    matches!(expr, Expr::Constant(c) if matches!(c.value, Constant::Bool(false)))
}

/// True if a suite opens with a string-literal documentation statement
pub fn has_docstring(body: &[Stmt]) -> bool {
    match body.first() {
        Some(Stmt::Expr(s)) => {
            matches!(&*s.value, Expr::Constant(c) if matches!(c.value, Constant::Str(_)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::parse_module;

    #[test]
    fn visits_nested_statements() {
        let suite = parse_module("def f():\n    if x:\n        y = 1\n").unwrap();
        let mut count = 0;
        visit_stmts(&suite, &mut |_| count += 1);
        // def, if, assign
        assert_eq!(count, 3);
    }

    #[test]
    fn visits_expressions_in_nested_contexts() {
        let suite = parse_module("z = [a for a in items if a.flag]\n").unwrap();
        let mut names = Vec::new();
        visit_stmt_exprs(&suite[0], &mut |e| {
            if let Expr::Name(n) = e {
                names.push(n.id.to_string());
            }
        });
        assert!(names.contains(&"items".to_string()));
        assert!(names.contains(&"a".to_string()));
        assert!(names.contains(&"z".to_string()));
    }

    #[test]
    fn detects_false_constant_tests() {
        let suite = parse_module("if False:\n    pass\nif x:\n    pass\n").unwrap();
        let tests: Vec<bool> = suite
            .iter()
            .filter_map(|s| match s {
                Stmt::If(i) => Some(is_false_constant(&i.test)),
                _ => None,
            })
            .collect();
        assert_eq!(tests, vec![true, false]);
    }

    #[test]
    fn detects_docstrings() {
        let with_doc = parse_module("def f():\n    \"\"\"doc\"\"\"\n    pass\n").unwrap();
        let without = parse_module("def f():\n    pass\n").unwrap();
        let body_of = |suite: &[Stmt]| match &suite[0] {
            Stmt::FunctionDef(f) => f.body.clone(),
            _ => panic!("expected function"),
        };
        assert!(has_docstring(&body_of(&with_doc)));
        assert!(!has_docstring(&body_of(&without)));
    }
}
