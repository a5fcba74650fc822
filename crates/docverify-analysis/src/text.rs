// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw recognizer output plus its cleaned line list.

/// Lines shorter than this (after trimming) are OCR noise.
pub const MIN_LINE_LEN: usize = 3;

/// Text returned by the recognizer for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognizedText {
    raw: String,
    lines: Vec<String>,
}

impl RecognizedText {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let lines = raw
            .lines()
            .map(str::trim)
            .filter(|line| line.chars().count() >= MIN_LINE_LEN)
            .map(str::to_owned)
            .collect();
        Self { raw, lines }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Trimmed, non-trivial lines in reading order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }

    pub fn into_raw(self) -> String {
        self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_short_and_blank_lines() {
        let text = RecognizedText::new("  INCOME TAX DEPARTMENT  \n\nab\n  \r\nJOHN DOE\n|");
        assert_eq!(text.lines(), ["INCOME TAX DEPARTMENT", "JOHN DOE"]);
    }

    #[test]
    fn keeps_three_char_lines() {
        let text = RecognizedText::new("DOB\nM");
        assert_eq!(text.lines(), ["DOB"]);
    }

    #[test]
    fn empty_text_has_no_lines() {
        let text = RecognizedText::new("");
        assert!(text.is_empty());
        assert!(text.lines().is_empty());
    }
}
