//! Structural rewrite engine
//!
//! One walk over the parsed tree collects byte-range edits (docstring
//! insertion, dead-branch deletion, unused-import removal); the edits are
//! applied bottom-up in a second pass so earlier offsets stay valid, with
//! deletions applied before insertions at the same offset. Identifier
//! renames run as a final word-boundary substitution over the edited text.
//!
//! Every mutation is idempotent: each checks for its precondition (missing
//! docstring, literal-False test, unused binding, CamelCase name) before
//! touching anything, so a second run over the engine's own output is a
//! no-op. The engine never serializes findings or talks to the outside
//! world; it returns the rewritten text plus an exact change count.

use regex::Regex;
use rustpython_parser::ast::{Ranged, Stmt, Suite};
use thiserror::Error;
use tracing::debug;

use crate::config::RewriteConfig;
use crate::models::{RewriteChange, RewriteKind};
use crate::rules::{import_binding_name, walk, RuleContext};

/// Text inserted as the leading documentation statement
const SYNTHETIC_DOCSTRING: &str = "\"\"\"Auto-generated docstring.\"\"\"";

/// Output of one rewrite pass
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub source: String,
    pub change_count: usize,
    pub log: Vec<RewriteChange>,
}

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("invalid rename pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
    seq: usize,
}

pub struct RewriteEngine<'a> {
    config: &'a RewriteConfig,
}

impl<'a> RewriteEngine<'a> {
    pub fn new(config: &'a RewriteConfig) -> Self {
        Self { config }
    }

    /// Apply all enabled rewrites to `source`, guided by its parsed tree
    pub fn rewrite(
        &self,
        suite: &Suite,
        source: &str,
        ctx: &RuleContext,
    ) -> Result<TransformResult, RewriteError> {
        let mut state = RewriteState {
            source,
            line_starts: line_starts(source),
            config: self.config,
            ctx,
            edits: Vec::new(),
            renames: Vec::new(),
            log: Vec::new(),
            seq: 0,
        };
        state.process_body(suite, true);

        let mut text = apply_edits(source, state.edits);
        for (old, new) in &state.renames {
            let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(old)))?;
            text = pattern.replace_all(&text, new.as_str()).into_owned();
        }

        let change_count = state.log.len();
        debug!(change_count, "rewrite pass complete");
        Ok(TransformResult {
            source: text,
            change_count,
            log: state.log,
        })
    }
}

struct RewriteState<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
    config: &'a RewriteConfig,
    ctx: &'a RuleContext,
    edits: Vec<Edit>,
    renames: Vec<(String, String)>,
    log: Vec<RewriteChange>,
    seq: usize,
}

impl<'a> RewriteState<'a> {
    fn process_body(&mut self, stmts: &'a [Stmt], is_module: bool) {
        if stmts.is_empty() {
            return;
        }
        let mut deleted = 0usize;

        for stmt in stmts {
            match stmt {
                Stmt::If(if_stmt)
                    if self.config.prune_dead_branches
                        && walk::is_false_constant(&if_stmt.test)
                        && if_stmt.orelse.is_empty() =>
                {
                    let start: usize = if_stmt.range.start().into();
                    let end: usize = if_stmt.range.end().into();
                    if self.owns_whole_lines(start, end) {
                        let line = self.line_of(start);
                        self.delete_lines(start, end);
                        self.record(
                            RewriteKind::PruneDeadBranch,
                            line,
                            "removed unreachable 'if False' branch",
                        );
                        deleted += 1;
                    }
                    // no recursion into a dead branch
                }
                Stmt::Import(_) | Stmt::ImportFrom(_)
                    if self.config.drop_unused_imports && self.import_is_droppable(stmt) =>
                {
                    let start: usize = stmt.range().start().into();
                    let end: usize = stmt.range().end().into();
                    // a statement sharing its line with other code is left
                    // in place; line deletion must never take live code
                    if self.owns_whole_lines(start, end) {
                        let line = self.line_of(start);
                        self.delete_lines(start, end);
                        self.record(
                            RewriteKind::DropUnusedImport,
                            line,
                            "removed import with no used names",
                        );
                        deleted += 1;
                    }
                }
                Stmt::FunctionDef(func) => {
                    self.process_function(
                        func.name.as_str(),
                        &func.body,
                        func.range.start().into(),
                    );
                }
                Stmt::AsyncFunctionDef(func) => {
                    self.process_function(
                        func.name.as_str(),
                        &func.body,
                        func.range.start().into(),
                    );
                }
                other => {
                    for body in walk::child_bodies(other) {
                        self.process_body(body, false);
                    }
                }
            }
        }

        // an emptied suite is structurally invalid; keep it parseable
        if !is_module && deleted == stmts.len() {
            let first: usize = stmts[0].range().start().into();
            let line = self.line_of(first);
            let indent = self.indent_before(first).unwrap_or_default();
            self.insert(self.start_of_line(first), format!("{indent}pass\n"));
            self.record(
                RewriteKind::PruneDeadBranch,
                line,
                "inserted 'pass' placeholder in emptied body",
            );
        }
    }

    fn process_function(&mut self, name: &str, body: &'a [Stmt], def_start: usize) {
        if self.config.normalize_casing {
            let snake = camel_to_snake(name);
            if snake != name {
                let line = self.line_of(def_start);
                self.renames.push((name.to_string(), snake.clone()));
                self.record(
                    RewriteKind::NormalizeCasing,
                    line,
                    format!("renamed '{name}' to '{snake}'"),
                );
            }
        }

        if self.config.insert_docstrings && !walk::has_docstring(body) {
            if let Some(first) = body.first() {
                let body_start: usize = first.range().start().into();
                // only a body on its own line below the signature can take
                // an inserted statement; one-line suites are left alone
                if self.line_of(body_start) > self.line_of(def_start) {
                    if let Some(indent) = self.indent_before(body_start) {
                        let line = self.line_of(def_start);
                        self.insert(
                            self.start_of_line(body_start),
                            format!("{indent}{SYNTHETIC_DOCSTRING}\n"),
                        );
                        self.record(
                            RewriteKind::InsertDocstring,
                            line,
                            format!("inserted docstring for '{name}'"),
                        );
                    }
                }
            }
        }

        self.process_body(body, false);
    }

    fn import_is_droppable(&self, stmt: &Stmt) -> bool {
        let names = match stmt {
            Stmt::Import(import) => &import.names,
            Stmt::ImportFrom(import) => &import.names,
            _ => return false,
        };
        if names.is_empty() {
            return false;
        }
        names.iter().all(|alias| {
            let binding = import_binding_name(
                alias.asname.as_ref().map(|a| a.as_str()),
                alias.name.as_str(),
            );
            binding != "*" && !self.ctx.read_names.contains(&binding)
        })
    }

    fn record(&mut self, kind: RewriteKind, line: usize, description: impl Into<String>) {
        self.log.push(RewriteChange::new(kind, line, description));
    }

    fn insert(&mut self, at: usize, text: String) {
        let seq = self.seq;
        self.seq += 1;
        self.edits.push(Edit {
            start: at,
            end: at,
            text,
            seq,
        });
    }

    /// True when the statement spanning [start, end) is the only code on
    /// its lines: nothing but indentation before it, and nothing but
    /// whitespace or a trailing comment after it.
    fn owns_whole_lines(&self, start: usize, end: usize) -> bool {
        let from = self.start_of_line(start);
        let to = self.end_of_line_incl(end.saturating_sub(1).max(start));
        let before = &self.source[from..start];
        if !before.chars().all(|c| c == ' ' || c == '\t') {
            return false;
        }
        let after = self.source[end.min(to)..to].trim_start();
        after.is_empty() || after.starts_with('#')
    }

    /// Delete the whole lines spanned by [start, end)
    fn delete_lines(&mut self, start: usize, end: usize) {
        let from = self.start_of_line(start);
        let to = self.end_of_line_incl(end.saturating_sub(1).max(start));
        let seq = self.seq;
        self.seq += 1;
        self.edits.push(Edit {
            start: from,
            end: to,
            text: String::new(),
            seq,
        });
    }

    fn line_of(&self, offset: usize) -> usize {
        line_index(&self.line_starts, offset) + 1
    }

    fn start_of_line(&self, offset: usize) -> usize {
        self.line_starts[line_index(&self.line_starts, offset)]
    }

    /// End of the line containing `offset`, including its newline
    fn end_of_line_incl(&self, offset: usize) -> usize {
        let idx = line_index(&self.line_starts, offset);
        match self.line_starts.get(idx + 1) {
            Some(next) => *next,
            None => self.source.len(),
        }
    }

    /// Leading whitespace of the line holding `offset`, or `None` when
    /// code precedes the offset on its line
    fn indent_before(&self, offset: usize) -> Option<String> {
        let start = self.start_of_line(offset);
        let prefix = &self.source[start..offset];
        if prefix.chars().all(|c| c == ' ' || c == '\t') {
            Some(prefix.to_string())
        } else {
            None
        }
    }
}

fn line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in source.bytes().enumerate() {
        if b == b'\n' && i + 1 < source.len() {
            starts.push(i + 1);
        }
    }
    starts
}

/// 0-based index of the line containing `offset`
fn line_index(line_starts: &[usize], offset: usize) -> usize {
    match line_starts.binary_search(&offset) {
        Ok(idx) => idx,
        Err(idx) => idx.saturating_sub(1),
    }
}

/// Apply edits bottom-up. For equal start offsets, larger ranges (deletes)
/// go first and later-queued insertions land after earlier ones, so a
/// docstring queued before a placeholder ends up above it.
fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| {
        b.start
            .cmp(&a.start)
            .then(b.end.cmp(&a.end))
            .then(b.seq.cmp(&a.seq))
    });
    let mut text = source.to_string();
    for edit in edits {
        let end = edit.end.min(text.len());
        let start = edit.start.min(end);
        text.replace_range(start..end, &edit.text);
    }
    text
}

/// CamelCase (or mixedCase) to snake_case
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_ascii_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewriteConfig;
    use crate::repair::parse_module;

    fn rewrite_with(source: &str, config: &RewriteConfig) -> TransformResult {
        let suite = parse_module(source).unwrap();
        let ctx = RuleContext::build(&suite, source);
        RewriteEngine::new(config).rewrite(&suite, source, &ctx).unwrap()
    }

    fn rewrite(source: &str) -> TransformResult {
        rewrite_with(source, &RewriteConfig::default())
    }

    #[test]
    fn inserts_docstring_once() {
        let result = rewrite("def f(x):\n    return x\n");
        assert_eq!(result.change_count, 1);
        assert_eq!(
            result.source,
            "def f(x):\n    \"\"\"Auto-generated docstring.\"\"\"\n    return x\n"
        );
        // second pass is a no-op
        let again = rewrite(&result.source);
        assert_eq!(again.change_count, 0);
        assert_eq!(again.source, result.source);
    }

    #[test]
    fn documented_function_untouched() {
        let source = "def f(x):\n    \"\"\"Return x.\"\"\"\n    return x\n";
        let result = rewrite(source);
        assert_eq!(result.change_count, 0);
        assert_eq!(result.source, source);
    }

    #[test]
    fn prunes_module_level_dead_branch() {
        let result = rewrite("x = 1\nif False:\n    risky()\ny = 2\n");
        assert_eq!(result.source, "x = 1\ny = 2\n");
        assert_eq!(result.change_count, 1);
        assert_eq!(result.log[0].kind, RewriteKind::PruneDeadBranch);
    }

    #[test]
    fn pruned_function_body_gets_placeholder() {
        let source = "def f():\n    \"\"\"doc\"\"\"\n    if False:\n        risky()\n";
        let result = rewrite(source);
        // docstring statement keeps the body non-empty, so no placeholder
        assert_eq!(result.source, "def f():\n    \"\"\"doc\"\"\"\n");

        let source = "def g():\n    \"\"\"doc\"\"\"\n";
        let result2 = rewrite(source);
        assert_eq!(result2.change_count, 0);
        assert_eq!(result2.source, source);
    }

    #[test]
    fn fully_pruned_body_stays_parseable() {
        let mut config = RewriteConfig::default();
        config.insert_docstrings = false;
        config.normalize_casing = false;
        let result = rewrite_with("def f():\n    if False:\n        risky()\n", &config);
        assert_eq!(result.source, "def f():\n    pass\n");
        assert!(parse_module(&result.source).is_ok());
        // prune + placeholder are both logged
        assert_eq!(result.change_count, 2);
    }

    #[test]
    fn conservativeness_non_constant_tests_survive() {
        let mut config = RewriteConfig::default();
        config.insert_docstrings = false;
        let source = "if flag:\n    a()\nif True:\n    b()\nif not False:\n    c()\n";
        let result = rewrite_with(source, &config);
        assert_eq!(result.source, source);
        assert_eq!(result.change_count, 0);
    }

    #[test]
    fn dead_branch_with_else_is_kept() {
        let mut config = RewriteConfig::default();
        config.insert_docstrings = false;
        let source = "if False:\n    a()\nelse:\n    b()\n";
        let result = rewrite_with(source, &config);
        assert_eq!(result.source, source);
    }

    #[test]
    fn normalizes_camel_case_definition_names() {
        let source = "def ProcessData(x):\n    \"\"\"doc\"\"\"\n    return x\n\ny = ProcessData(1)\n";
        let result = rewrite(source);
        assert_eq!(result.change_count, 1);
        assert!(result.source.contains("def process_data(x):"));
        assert!(result.source.contains("y = process_data(1)"));
        let again = rewrite(&result.source);
        assert_eq!(again.change_count, 0);
    }

    #[test]
    fn camel_to_snake_cases() {
        assert_eq!(camel_to_snake("ProcessData"), "process_data");
        assert_eq!(camel_to_snake("getHTTPResponse"), "get_http_response");
        assert_eq!(camel_to_snake("already_snake"), "already_snake");
        assert_eq!(camel_to_snake("HTTPServer"), "http_server");
    }

    #[test]
    fn drops_fully_unused_import() {
        let mut config = RewriteConfig::default();
        config.insert_docstrings = false;
        let result = rewrite_with("import os\nprint('hi')\n", &config);
        assert_eq!(result.source, "print('hi')\n");
        assert_eq!(result.log[0].kind, RewriteKind::DropUnusedImport);
    }

    #[test]
    fn import_with_any_used_name_survives() {
        let mut config = RewriteConfig::default();
        config.insert_docstrings = false;
        let source = "from os import path, sep\nprint(path)\n";
        let result = rewrite_with(source, &config);
        assert_eq!(result.source, source);
    }

    #[test]
    fn import_sharing_a_line_with_live_code_is_kept() {
        let mut config = RewriteConfig::default();
        config.insert_docstrings = false;
        // `import os` is unused, but deleting its line would take the
        // referenced `import sys` with it
        let source = "import os; import sys\nprint(sys.path)\n";
        let result = rewrite_with(source, &config);
        assert_eq!(result.source, source);
        assert_eq!(result.change_count, 0);
    }

    #[test]
    fn import_with_trailing_comment_is_still_dropped() {
        let mut config = RewriteConfig::default();
        config.insert_docstrings = false;
        let result = rewrite_with("import os  # unused\nprint('hi')\n", &config);
        assert_eq!(result.source, "print('hi')\n");
        assert_eq!(result.change_count, 1);
    }

    #[test]
    fn import_used_in_nested_scope_survives() {
        let mut config = RewriteConfig::default();
        config.insert_docstrings = false;
        let source = "import os\ndef f():\n    return os.getcwd()\n";
        let result = rewrite_with(source, &config);
        assert!(result.source.contains("import os"));
    }

    #[test]
    fn toggles_disable_individual_rewrites() {
        let config = RewriteConfig {
            insert_docstrings: false,
            prune_dead_branches: false,
            normalize_casing: false,
            drop_unused_imports: false,
        };
        let source = "import os\ndef BadName():\n    if False:\n        x()\n";
        let result = rewrite_with(source, &config);
        assert_eq!(result.source, source);
        assert_eq!(result.change_count, 0);
    }

    #[test]
    fn docstring_insert_combines_with_full_prune() {
        let result = rewrite("def f():\n    if False:\n        risky()\n");
        assert!(parse_module(&result.source).is_ok());
        let lines: Vec<&str> = result.source.lines().collect();
        assert_eq!(lines[0], "def f():");
        assert_eq!(lines[1], "    \"\"\"Auto-generated docstring.\"\"\"");
        assert_eq!(lines[2], "    pass");
    }
}
