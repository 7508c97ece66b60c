//! Mutable source buffer threaded through the normalizer and repair loop
//!
//! One buffer per analysis request; never shared across requests. Lines are
//! addressed 1-based to match parser and diagnostic line numbers.

/// Owned source text with a line-oriented view
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl SourceBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(|l| l.to_string()).collect(),
            trailing_newline: text.ends_with('\n'),
        }
    }

    /// Reassemble the buffer into owned text
    pub fn text(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// 1-based line lookup
    pub fn line(&self, line: usize) -> Option<&str> {
        if line == 0 {
            return None;
        }
        self.lines.get(line - 1).map(|s| s.as_str())
    }

    /// Nearest line at or above `line` with non-whitespace content
    pub fn nonblank_at_or_above(&self, line: usize) -> Option<(usize, &str)> {
        let start = line.min(self.lines.len());
        (1..=start).rev().find_map(|n| {
            let text = self.lines.get(n - 1)?;
            if text.trim().is_empty() {
                None
            } else {
                Some((n, text.as_str()))
            }
        })
    }

    /// Replace a line (1-based); out-of-range is a no-op
    pub fn set_line(&mut self, line: usize, text: String) {
        if line >= 1 && line <= self.lines.len() {
            self.lines[line - 1] = text;
        }
    }

    /// Append a suffix to a line (1-based); out-of-range is a no-op
    pub fn append_to_line(&mut self, line: usize, suffix: &str) {
        if line >= 1 && line <= self.lines.len() {
            self.lines[line - 1].push_str(suffix);
        }
    }

    /// Append a suffix to the final line of the buffer
    pub fn append_to_end(&mut self, suffix: &str) {
        match self.lines.last_mut() {
            Some(last) => last.push_str(suffix),
            None => self.lines.push(suffix.to_string()),
        }
    }

    /// Rewrite every line through `f`, returning how many lines changed
    pub fn map_lines(&mut self, mut f: impl FnMut(&str) -> Option<String>) -> usize {
        let mut changed = 0;
        for line in &mut self.lines {
            if let Some(new) = f(line) {
                if new != *line {
                    *line = new;
                    changed += 1;
                }
            }
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines.iter().enumerate().map(|(i, l)| (i + 1, l.as_str()))
    }
}
