// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Field extraction from noisy recognized text.
//
// Three strategies run in order, each only filling slots that are still
// empty:
//
// 1. Label scan: a line starting with a known label ("NAME", "DOB", ...)
//    yields the rest of the line as that label's value.
// 2. Identifier patterns: PAN-style and Aadhaar-style numbers anywhere in
//    the raw text, tried only when no identifier was labelled.
// 3. Name fallback: the line after a "NAME"/"INCOME TAX" line, if it looks
//    like an upper-case name.
//
// A pattern hit also reports the category its number format belongs to, so
// the caller can promote an unknown classification. That promotion is a
// heuristic: a stray 12-digit number on an unrelated document reads as an
// Aadhaar card.

use std::sync::LazyLock;

use docverify_core::types::{DocumentCategory, ExtractedFields, Field};
use regex::Regex;
use tracing::debug;

use crate::text::RecognizedText;

/// Label values at or below this length are treated as OCR debris.
const MIN_VALUE_LEN: usize = 2;

struct LabelRule {
    token: &'static str,
    field: Option<Field>,
}

/// Checked in order; the first label a line starts with wins that line.
static LABELS: &[LabelRule] = &[
    LabelRule { token: "NAME", field: Some(Field::Name) },
    LabelRule { token: "FATHER", field: None },
    LabelRule { token: "DOB", field: Some(Field::DateOfBirth) },
    LabelRule { token: "DATE OF BIRTH", field: Some(Field::DateOfBirth) },
    LabelRule { token: "ID NO", field: Some(Field::IdNumber) },
    LabelRule { token: "ACCOUNT NO", field: Some(Field::IdNumber) },
];

struct IdPattern {
    regex: Regex,
    category: DocumentCategory,
}

/// Tried in order over the raw text; the first match is the identifier.
static ID_PATTERNS: LazyLock<Vec<IdPattern>> = LazyLock::new(|| {
    vec![
        // PAN: five letters, four digits, one letter.
        IdPattern {
            regex: Regex::new(r"[A-Z]{5}[0-9]{4}[A-Z]").expect("PAN pattern"),
            category: DocumentCategory::TaxId,
        },
        // Aadhaar: twelve ASCII digits, optionally grouped in fours.
        IdPattern {
            regex: Regex::new(r"\b[0-9]{4}\s?[0-9]{4}\s?[0-9]{4}\b").expect("Aadhaar pattern"),
            category: DocumentCategory::NationalId,
        },
    ]
});

/// Lines that usually sit just above the holder's name.
const NAME_ANCHORS: &[&str] = &["NAME", "INCOME TAX"];

static NAME_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z\s.]+$").expect("name line pattern"));

/// Output of [`extract`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub fields: ExtractedFields,
    /// Category implied by the identifier pattern that matched, if the
    /// identifier came from the pattern fallback.
    pub pattern_category: Option<DocumentCategory>,
}

/// Pull identifier, name, date of birth and generic label pairs out of `text`.
pub fn extract(text: &RecognizedText) -> Extraction {
    let mut fields = ExtractedFields::new();

    scan_labels(text.lines(), &mut fields);

    let pattern_category = if fields.is_set(Field::IdNumber) {
        None
    } else {
        match_id_pattern(text.raw(), &mut fields)
    };

    if !fields.is_set(Field::Name) {
        guess_name(text.lines(), &mut fields);
    }

    Extraction {
        fields,
        pattern_category,
    }
}

/// `"DATE OF BIRTH"` -> `"date_of_birth"`.
fn label_key(token: &str) -> String {
    token.to_ascii_lowercase().replace(' ', "_")
}

fn scan_labels(lines: &[String], fields: &mut ExtractedFields) {
    for line in lines {
        let Some((rule, rest)) = LABELS.iter().find_map(|rule| {
            strip_label(line, rule.token).map(|rest| (rule, rest))
        }) else {
            continue;
        };

        let value = rest
            .trim_start_matches(|c: char| !c.is_ascii_alphanumeric())
            .trim();
        if value.chars().count() <= MIN_VALUE_LEN {
            continue;
        }

        debug!(label = rule.token, value, "Label matched");
        fields.fill_label(label_key(rule.token), value);
        if let Some(field) = rule.field {
            fields.fill(field, value);
        }
    }
}

/// The remainder of `line` if it starts with `token`, ignoring ASCII case.
fn strip_label<'a>(line: &'a str, token: &str) -> Option<&'a str> {
    let prefix = line.get(..token.len())?;
    prefix
        .eq_ignore_ascii_case(token)
        .then(|| &line[token.len()..])
}

fn match_id_pattern(raw: &str, fields: &mut ExtractedFields) -> Option<DocumentCategory> {
    ID_PATTERNS.iter().find_map(|pattern| {
        let found = pattern.regex.find(raw)?;
        debug!(id = found.as_str(), category = ?pattern.category, "Identifier pattern matched");
        fields.fill(Field::IdNumber, found.as_str());
        Some(pattern.category)
    })
}

fn guess_name(lines: &[String], fields: &mut ExtractedFields) {
    let anchor = lines.iter().position(|line| {
        let upper = line.to_uppercase();
        NAME_ANCHORS.iter().any(|anchor| upper.contains(anchor))
    });

    let candidate = anchor.and_then(|idx| lines.get(idx + 1));
    if let Some(candidate) = candidate
        && NAME_LINE.is_match(candidate)
    {
        debug!(name = %candidate, "Name taken from line after anchor");
        fields.fill(Field::Name, candidate.as_str());
    }
}
