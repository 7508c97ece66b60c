//! Source normalizer: superficial text fixes applied before any parse attempt
//!
//! Three passes in fixed order: tab expansion, case-insensitive foreign
//! literal translation (`true`/`false`/`null` spellings to Python's
//! `True`/`False`/`None`), and naive missing-colon insertion on lines that
//! open a block. Pure text-to-text, no I/O, no failure path: where no rule
//! matches, input passes through untouched.
//!
//! Idempotent by construction: a second run over its own output produces
//! identical text and zero further repair actions.

use regex::Regex;

use crate::config::RepairConfig;
use crate::models::{RepairAction, RepairKind};
use crate::source::SourceBuffer;

/// Keywords that introduce an indented block and require a trailing colon
const BLOCK_KEYWORDS: &str =
    r"^(async\s+def|def|class|if|elif|else|for|while|try|except|finally|with)\b";

/// Foreign literal spellings and their Python equivalents.
///
/// Word-boundary matched so identifiers merely containing these substrings
/// (`construe`, `nullable`) are left alone.
const LITERAL_TRANSLATIONS: &[(&str, &str)] = &[
    (r"(?i)\btrue\b", "True"),
    (r"(?i)\bfalse\b", "False"),
    (r"(?i)\bnull\b", "None"),
    (r"(?i)\bnone\b", "None"),
];

pub struct Normalizer {
    tab_width: usize,
    literal_patterns: Vec<(Regex, &'static str)>,
    block_intro: Regex,
}

impl Normalizer {
    pub fn new(config: &RepairConfig) -> Self {
        let literal_patterns = LITERAL_TRANSLATIONS
            .iter()
            .map(|(pattern, canonical)| {
                let re = Regex::new(pattern)
                    .expect("valid regex: pattern built from hardcoded constants");
                (re, *canonical)
            })
            .collect();
        let block_intro = Regex::new(BLOCK_KEYWORDS)
            .expect("valid regex: pattern built from hardcoded constants");
        Self {
            tab_width: config.tab_width.max(1),
            literal_patterns,
            block_intro,
        }
    }

    /// Run all normalization passes, returning the new text and the ordered
    /// list of textual repair actions.
    pub fn normalize(&self, source: &str) -> (String, Vec<RepairAction>) {
        let mut buffer = SourceBuffer::new(source);
        let mut actions = Vec::new();

        self.expand_tabs(&mut buffer, &mut actions);
        self.translate_buffer_literals(&mut buffer, &mut actions);
        self.insert_missing_colons(&mut buffer, &mut actions);

        (buffer.text(), actions)
    }

    fn expand_tabs(&self, buffer: &mut SourceBuffer, actions: &mut Vec<RepairAction>) {
        let unit = " ".repeat(self.tab_width);
        let changed_lines: Vec<usize> = buffer
            .iter()
            .filter(|(_, text)| text.contains('\t'))
            .map(|(n, _)| n)
            .collect();
        buffer.map_lines(|line| {
            if line.contains('\t') {
                Some(line.replace('\t', &unit))
            } else {
                None
            }
        });
        for line in changed_lines {
            actions.push(RepairAction::new(
                RepairKind::TabExpansion,
                line,
                format!("expanded tabs to {} spaces", self.tab_width),
                1.0,
            ));
        }
    }

    fn translate_buffer_literals(&self, buffer: &mut SourceBuffer, actions: &mut Vec<RepairAction>) {
        let mut changed = Vec::new();
        for (n, text) in buffer.iter() {
            if let Some(new) = self.translate_literals(text) {
                changed.push((n, new));
            }
        }
        for (n, new) in changed {
            buffer.set_line(n, new);
            actions.push(RepairAction::new(
                RepairKind::LiteralTranslation,
                n,
                "translated foreign boolean/null literal to Python spelling",
                0.7,
            ));
        }
    }

    fn insert_missing_colons(&self, buffer: &mut SourceBuffer, actions: &mut Vec<RepairAction>) {
        let missing: Vec<usize> = buffer
            .iter()
            .filter(|(_, text)| self.needs_colon(text))
            .map(|(n, _)| n)
            .collect();
        for line in missing {
            buffer.append_to_line(line, ":");
            actions.push(RepairAction::new(
                RepairKind::MissingBlockTerminator,
                line,
                "appended missing ':' to block introducer",
                0.9,
            ));
        }
    }

    /// Translate foreign literals on one line; `None` if nothing changed
    pub(crate) fn translate_literals(&self, line: &str) -> Option<String> {
        let mut current = line.to_string();
        for (re, canonical) in &self.literal_patterns {
            if re.is_match(&current) {
                let replaced = re.replace_all(&current, *canonical).into_owned();
                current = replaced;
            }
        }
        if current != line {
            Some(current)
        } else {
            None
        }
    }

    /// True if the trimmed line opens a block
    pub(crate) fn is_block_introducer(&self, trimmed: &str) -> bool {
        self.block_intro.is_match(trimmed)
    }

    fn needs_colon(&self, line: &str) -> bool {
        let trimmed = line.trim();
        !trimmed.is_empty() && self.block_intro.is_match(trimmed) && !trimmed.ends_with(':')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(&RepairConfig::default())
    }

    #[test]
    fn expands_tabs_to_spaces() {
        let (text, actions) = normalizer().normalize("def f():\n\treturn 1\n");
        assert_eq!(text, "def f():\n    return 1\n");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, RepairKind::TabExpansion);
        assert_eq!(actions[0].line, 2);
    }

    #[test]
    fn translates_foreign_literals_case_insensitively() {
        let (text, actions) = normalizer().normalize("x = true\ny = FALSE\nz = null\n");
        assert_eq!(text, "x = True\ny = False\nz = None\n");
        assert_eq!(actions.len(), 3);
        assert!(actions
            .iter()
            .all(|a| a.kind == RepairKind::LiteralTranslation));
    }

    #[test]
    fn literal_translation_respects_word_boundaries() {
        let (text, actions) = normalizer().normalize("construed = nullable\n");
        assert_eq!(text, "construed = nullable\n");
        assert!(actions.is_empty());
    }

    #[test]
    fn canonical_literals_produce_no_action() {
        let (text, actions) = normalizer().normalize("x = True\ny = None\n");
        assert_eq!(text, "x = True\ny = None\n");
        assert!(actions.is_empty());
    }

    #[test]
    fn appends_missing_colon_to_block_introducer() {
        let (text, actions) = normalizer().normalize("def broken(x)\n    return x\n");
        assert_eq!(text, "def broken(x):\n    return x\n");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, RepairKind::MissingBlockTerminator);
        assert_eq!(actions[0].line, 1);
    }

    #[test]
    fn leaves_wellformed_source_untouched() {
        let source = "def f(x):\n    return x\n";
        let (text, actions) = normalizer().normalize(source);
        assert_eq!(text, source);
        assert!(actions.is_empty());
    }

    #[test]
    fn idempotent_on_own_output() {
        let inputs = [
            "def broken(x)\n\treturn true\n",
            "if x\n    y = null\n",
            "class c\n\tpass\n",
        ];
        for input in inputs {
            let n = normalizer();
            let (once, actions_once) = n.normalize(input);
            assert!(!actions_once.is_empty());
            let (twice, actions_twice) = n.normalize(&once);
            assert_eq!(once, twice);
            assert!(actions_twice.is_empty(), "second pass must be a no-op");
        }
    }
}
