//! Bounded syntax repair loop
//!
//! Attempts a parse, classifies the failure into a closed set of fault
//! kinds, applies exactly one targeted fix, and retries. Terminates on
//! success, on an unclassifiable fault, on a fix that cannot make progress,
//! or when the attempt budget is exhausted. Never raises: all failure paths
//! return the best text produced so far (fail-open).
//!
//! Classification works from the parser message plus line context rather
//! than exact parser internals, since the same defect can surface with
//! different messages across parser versions.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use line_numbers::LinePositions;
use rustpython_parser::{ast, parse, Mode};
use tracing::debug;

use crate::config::AnalyzerConfig;
use crate::models::{FaultKind, RepairAction, RepairKind, SyntaxFault};
use crate::normalize::Normalizer;
use crate::source::SourceBuffer;

/// Statements that usually end an indented block, used by the reindenter
const BLOCK_CLOSERS: &[&str] = &["return", "pass", "break", "continue", "raise"];

/// Keywords rendered one level shallower than the running depth
const DEDENT_KEYWORDS: &[&str] = &["else", "elif", "except", "finally"];

/// Result of one repair run. `text` is always populated, even on failure.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub text: String,
    pub actions: Vec<RepairAction>,
    pub success: bool,
    /// Last parser fault when `success` is false
    pub fault: Option<SyntaxFault>,
}

/// Parse source as a Python module, mapping failures to a [`SyntaxFault`]
pub fn parse_module(text: &str) -> Result<ast::Suite, SyntaxFault> {
    match parse(text, Mode::Module, "<analysis>") {
        Ok(ast::Mod::Module(module)) => Ok(module.body),
        // Mode::Module only ever yields Mod::Module
        Ok(_) => Ok(Vec::new()),
        Err(e) => Err(SyntaxFault {
            line: line_of_offset(text, e.offset.into()),
            message: e.error.to_string(),
        }),
    }
}

fn line_of_offset(text: &str, offset: usize) -> usize {
    if text.is_empty() {
        return 1;
    }
    let clamped = offset.min(text.len().saturating_sub(1));
    let positions = LinePositions::from(text);
    positions.from_offset(clamped).as_usize() + 1
}

/// Run the bounded repair loop over `text`
pub fn repair(text: &str, config: &AnalyzerConfig) -> RepairOutcome {
    let normalizer = Normalizer::new(&config.repair);
    let mut buffer = SourceBuffer::new(text);
    let mut actions = Vec::new();
    let mut seen: HashSet<u64> = HashSet::new();
    seen.insert(text_hash(&buffer.text()));
    let mut last_fault = None;

    for attempt in 1..=config.repair.max_attempts {
        let current = buffer.text();
        let fault = match parse_module(&current) {
            Ok(_) => {
                debug!(attempt, "source parses");
                return RepairOutcome {
                    text: current,
                    actions,
                    success: true,
                    fault: None,
                };
            }
            Err(fault) => fault,
        };

        let (kind, target) = classify(&fault, &buffer, &normalizer, config.repair.close_brackets);
        debug!(attempt, ?kind, line = target, message = %fault.message, "classified fault");
        last_fault = Some(fault);

        if kind == FaultKind::Unclassified {
            break;
        }
        let action = match apply_fix(kind, target, &mut buffer, &normalizer, config.repair.tab_width)
        {
            Some(action) => action,
            // the fix found nothing to change on the faulting line
            None => break,
        };
        // a fix that lands on an already-seen state changed nothing worth
        // auditing; stop without logging it
        if !seen.insert(text_hash(&buffer.text())) {
            debug!(attempt, "fix reproduced an earlier buffer state, stopping");
            break;
        }
        actions.push(action);
    }

    // A fix applied on the final attempt may still have landed
    let final_text = buffer.text();
    let success = parse_module(&final_text).is_ok();
    RepairOutcome {
        text: final_text,
        actions,
        success,
        fault: if success { None } else { last_fault },
    }
}

/// Classify a fault into a fix kind and the line the fix targets
fn classify(
    fault: &SyntaxFault,
    buffer: &SourceBuffer,
    normalizer: &Normalizer,
    close_brackets: bool,
) -> (FaultKind, usize) {
    let msg = fault.message.to_lowercase();

    // Missing ':' on the faulting line or the nearest code line above it;
    // the parser often reports the error one line past the defect.
    if let Some(line) = find_open_introducer(buffer, fault.line, normalizer) {
        return (FaultKind::MissingBlockTerminator, line);
    }

    // A suite opener directly above a line that did not indent, or a parser
    // message that names indentation explicitly.
    if msg.contains("indent") || msg.contains("tab") || missing_indent_after_colon(buffer, fault.line)
    {
        return (FaultKind::BadIndentation, fault.line);
    }

    if let Some(line) = find_odd_quote_line(buffer, fault.line) {
        return (FaultKind::UnterminatedString, line);
    }

    if close_brackets && unclosed_bracket(buffer).is_some() {
        return (FaultKind::UnbalancedBracket, fault.line);
    }

    if let Some((line, _)) = fault_line_or_above(buffer, fault.line) {
        if normalizer.translate_literals(buffer.line(line).unwrap_or("")).is_some() {
            return (FaultKind::LiteralTokenMismatch, line);
        }
    }

    (FaultKind::Unclassified, fault.line)
}

/// Apply the single fix for a classified fault; `None` if nothing changed
fn apply_fix(
    kind: FaultKind,
    line: usize,
    buffer: &mut SourceBuffer,
    normalizer: &Normalizer,
    tab_width: usize,
) -> Option<RepairAction> {
    match kind {
        FaultKind::MissingBlockTerminator => {
            buffer.append_to_line(line, ":");
            Some(RepairAction::new(
                RepairKind::MissingBlockTerminator,
                line,
                "appended missing ':' to block introducer",
                0.9,
            ))
        }
        FaultKind::UnterminatedString => {
            let quote = odd_quote_char(buffer.line(line)?)?;
            buffer.append_to_line(line, &quote.to_string());
            Some(RepairAction::new(
                RepairKind::UnterminatedString,
                line,
                format!("appended matching {quote} to unterminated string"),
                0.6,
            ))
        }
        FaultKind::UnbalancedBracket => {
            let closer = unclosed_bracket(buffer)?;
            buffer.append_to_end(&closer.to_string());
            Some(RepairAction::new(
                RepairKind::UnbalancedBracket,
                buffer.line_count().max(1),
                format!("appended '{closer}' at end of source"),
                0.5,
            ))
        }
        FaultKind::BadIndentation => {
            reindent(buffer, tab_width);
            Some(RepairAction::new(
                RepairKind::BadIndentation,
                line,
                "re-derived indentation from block depth",
                0.4,
            ))
        }
        FaultKind::LiteralTokenMismatch => {
            let changed = buffer.map_lines(|l| normalizer.translate_literals(l));
            if changed == 0 {
                return None;
            }
            Some(RepairAction::new(
                RepairKind::LiteralTranslation,
                line,
                "translated foreign boolean/null literal to Python spelling",
                0.7,
            ))
        }
        FaultKind::Unclassified => None,
    }
}

/// Block introducer without a trailing ':' at or just above `line`
fn find_open_introducer(
    buffer: &SourceBuffer,
    line: usize,
    normalizer: &Normalizer,
) -> Option<usize> {
    let check = |n: usize| -> Option<usize> {
        let text = buffer.line(n)?;
        let trimmed = text.trim();
        if !trimmed.is_empty()
            && normalizer.is_block_introducer(trimmed)
            && !trimmed.ends_with(':')
        {
            Some(n)
        } else {
            None
        }
    };
    if let Some(n) = check(line) {
        return Some(n);
    }
    let (above, _) = buffer.nonblank_at_or_above(line.saturating_sub(1))?;
    check(above)
}

/// The code line above `line` ends with ':' but `line` did not indent past it
fn missing_indent_after_colon(buffer: &SourceBuffer, line: usize) -> bool {
    let Some(current) = buffer.line(line) else {
        return false;
    };
    if current.trim().is_empty() {
        return false;
    }
    let Some((_, above)) = buffer.nonblank_at_or_above(line.saturating_sub(1)) else {
        return false;
    };
    above.trim_end().ends_with(':') && indent_width(current) <= indent_width(above)
}

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Quote character with an odd occurrence count on the line, if any
fn odd_quote_char(line: &str) -> Option<char> {
    for quote in ['"', '\''] {
        if line.matches(quote).count() % 2 == 1 {
            return Some(quote);
        }
    }
    None
}

/// Nearest line at or above `from` with an unpaired quote
fn find_odd_quote_line(buffer: &SourceBuffer, from: usize) -> Option<usize> {
    let start = from.min(buffer.line_count());
    (1..=start)
        .rev()
        .find(|&n| buffer.line(n).and_then(odd_quote_char).is_some())
}

/// Matching closer for the innermost unclosed bracket, scanning the whole
/// buffer and skipping quoted regions.
fn unclosed_bracket(buffer: &SourceBuffer) -> Option<char> {
    let mut stack: Vec<char> = Vec::new();
    for (_, line) in buffer.iter() {
        let mut in_string: Option<char> = None;
        for c in line.chars() {
            match in_string {
                Some(q) => {
                    if c == q {
                        in_string = None;
                    }
                }
                None => match c {
                    '"' | '\'' => in_string = Some(c),
                    '(' | '[' | '{' => stack.push(c),
                    ')' | ']' | '}' => {
                        stack.pop();
                    }
                    _ => {}
                },
            }
        }
    }
    stack.pop().map(|opener| match opener {
        '(' => ')',
        '[' => ']',
        _ => '}',
    })
}

fn fault_line_or_above<'a>(buffer: &'a SourceBuffer, line: usize) -> Option<(usize, &'a str)> {
    if let Some(text) = buffer.line(line) {
        if !text.trim().is_empty() {
            return Some((line, text));
        }
    }
    buffer.nonblank_at_or_above(line)
}

/// Re-derive every line's indentation from a running block depth counter.
///
/// Depth increments after lines ending in ':' and decrements after the
/// usual block-closing statements; else/elif/except/finally render one
/// level shallower. Crude by design (confidence 0.4).
fn reindent(buffer: &mut SourceBuffer, tab_width: usize) {
    let unit = " ".repeat(tab_width.max(1));
    let mut depth: usize = 0;
    buffer.map_lines(|line| {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Some(String::new());
        }
        let first_word = trimmed
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .next()
            .unwrap_or("");
        let render_depth = if DEDENT_KEYWORDS.contains(&first_word) {
            depth.saturating_sub(1)
        } else {
            depth
        };
        let rendered = format!("{}{}", unit.repeat(render_depth), trimmed);
        if trimmed.ends_with(':') {
            depth = render_depth + 1;
        } else if BLOCK_CLOSERS.contains(&first_word) {
            depth = render_depth.saturating_sub(1);
        }
        Some(rendered)
    });
}

fn text_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AnalyzerConfig {
        AnalyzerConfig::default()
    }

    #[test]
    fn wellformed_source_needs_no_repair() {
        let outcome = repair("def f(x):\n    return x\n", &config());
        assert!(outcome.success);
        assert!(outcome.actions.is_empty());
        assert_eq!(outcome.text, "def f(x):\n    return x\n");
    }

    #[test]
    fn empty_source_parses() {
        let outcome = repair("", &config());
        assert!(outcome.success);
        assert!(outcome.actions.is_empty());
    }

    #[test]
    fn repairs_missing_block_terminator() {
        // Scenario: `def broken(x)` without its colon
        let outcome = repair("def broken(x)\n    return x\n", &config());
        assert!(outcome.success);
        assert_eq!(outcome.actions.len(), 1);
        assert_eq!(outcome.actions[0].kind, RepairKind::MissingBlockTerminator);
        assert_eq!(outcome.actions[0].line, 1);
        assert!(parse_module(&outcome.text).is_ok());
        assert!(outcome.text.starts_with("def broken(x):"));
    }

    #[test]
    fn repairs_unterminated_string() {
        let outcome = repair("x = 'abc\n", &config());
        assert!(outcome.success, "fault: {:?}", outcome.fault);
        assert_eq!(outcome.actions.len(), 1);
        assert_eq!(outcome.actions[0].kind, RepairKind::UnterminatedString);
        assert_eq!(outcome.text, "x = 'abc'\n");
    }

    #[test]
    fn repairs_unbalanced_bracket() {
        let outcome = repair("x = (1 + 2\n", &config());
        assert!(outcome.success, "fault: {:?}", outcome.fault);
        assert_eq!(outcome.actions.len(), 1);
        assert_eq!(outcome.actions[0].kind, RepairKind::UnbalancedBracket);
        assert!(parse_module(&outcome.text).is_ok());
    }

    #[test]
    fn bracket_fix_respects_toggle() {
        let mut config = config();
        config.repair.close_brackets = false;
        let outcome = repair("x = (1 + 2\n", &config);
        assert!(!outcome.success);
        assert!(outcome.actions.is_empty());
        assert_eq!(outcome.text, "x = (1 + 2\n");
    }

    #[test]
    fn repairs_missing_indentation() {
        let outcome = repair("def f():\npass\n", &config());
        assert!(outcome.success, "fault: {:?}", outcome.fault);
        assert!(outcome
            .actions
            .iter()
            .any(|a| a.kind == RepairKind::BadIndentation));
        assert!(outcome.text.contains("    pass"));
    }

    #[test]
    fn unclassified_fault_fails_open() {
        let outcome = repair(")\n", &config());
        assert!(!outcome.success);
        assert_eq!(outcome.text, ")\n");
        let fault = outcome.fault.expect("fault recorded");
        assert_eq!(fault.line, 1);
    }

    #[test]
    fn attempt_budget_bounds_fix_count() {
        // Ten unclosed parens but only five attempts: loop must stop at the
        // budget and still return the best text so far.
        let outcome = repair("x = ((((((((((1\n", &config());
        assert!(!outcome.success);
        assert_eq!(outcome.actions.len(), 5);
        assert!(outcome.text.ends_with(")))))\n"));
    }

    #[test]
    fn literal_fix_applies_then_loop_fails_open() {
        // `true true` is translated once, still does not parse, and the
        // second classification finds nothing left to translate.
        let outcome = repair("true true\n", &config());
        assert!(!outcome.success);
        assert_eq!(outcome.actions.len(), 1);
        assert_eq!(outcome.actions[0].kind, RepairKind::LiteralTranslation);
        assert_eq!(outcome.text, "True True\n");
    }

    #[test]
    fn oscillation_guard_stops_ineffective_fix() {
        // reindenting `else` with no preceding body is a fixed point: the
        // loop must stop as soon as a fix reproduces a seen state, and a
        // fix that changed nothing must not be logged as a change
        let outcome = repair("if x:\nelse:\n", &config());
        assert!(!outcome.success);
        assert!(outcome.actions.is_empty());
        assert_eq!(outcome.text, "if x:\nelse:\n");
    }

    #[test]
    fn reindent_derives_depth_from_terminators() {
        let mut buffer = SourceBuffer::new("def f():\nif x:\nreturn 1\nreturn 2\n");
        reindent(&mut buffer, 4);
        assert_eq!(
            buffer.text(),
            "def f():\n    if x:\n        return 1\n    return 2\n"
        );
    }

    #[test]
    fn reindent_places_dedent_keywords_one_level_out() {
        let mut buffer = SourceBuffer::new("if x:\ny = 1\nelse:\ny = 2\n");
        reindent(&mut buffer, 4);
        assert_eq!(buffer.text(), "if x:\n    y = 1\nelse:\n    y = 2\n");
    }

    #[test]
    fn parse_module_reports_fault_line() {
        let fault = parse_module("x = 1\ny = (\n").unwrap_err();
        assert!(fault.line >= 1);
        assert!(!fault.message.is_empty());
    }
}
