// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docverify-analysis: deterministic post-processing of recognized text.
//
// Keyword classification, field extraction and confidence scoring. Nothing
// here touches the filesystem or can fail: empty or unrecognisable text just
// produces an unknown category, "Not Found" fields and the neutral score.

pub mod classify;
pub mod extract;
pub mod score;
pub mod text;

use docverify_core::types::{ClassificationResult, ExtractedFields, Field, VerificationStatus};
use tracing::info;

pub use classify::{Classification, classify};
pub use extract::{Extraction, extract};
pub use score::{score, status_for};
pub use text::RecognizedText;

/// Everything the text stages decided about one document.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAnalysis {
    pub classification: ClassificationResult,
    /// Keyword behind a keyword-based classification.
    pub matched_keyword: Option<&'static str>,
    /// Whether the category came from an identifier pattern instead of a keyword.
    pub upgraded_by_pattern: bool,
    pub fields: ExtractedFields,
    pub confidence: f64,
    pub status: VerificationStatus,
}

/// Classify, extract, upgrade and score `text`.
pub fn analyze_text(text: &RecognizedText) -> TextAnalysis {
    let Classification {
        result: mut classification,
        matched_keyword,
    } = classify(text.raw());

    let Extraction {
        fields,
        pattern_category,
    } = extract(text);

    let upgraded_by_pattern =
        pattern_category.is_some_and(|category| classification.upgrade_from_unknown(category));

    let confidence = score(
        classification.certainty,
        fields.is_set(Field::IdNumber),
        fields.is_set(Field::Name),
    );
    let status = status_for(confidence);

    info!(
        category = classification.category.label(),
        id_number = fields.id_number().display_value(),
        confidence,
        status = %status,
        "Text analysis complete"
    );

    TextAnalysis {
        classification,
        matched_keyword,
        upgraded_by_pattern,
        fields,
        confidence,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docverify_core::types::{DocumentCategory, NEUTRAL_CERTAINTY, NOT_FOUND};

    fn analyze(raw: &str) -> TextAnalysis {
        analyze_text(&RecognizedText::new(raw))
    }

    #[test]
    fn pan_card_is_verified() {
        let a = analyze("INCOME TAX DEPARTMENT\nABCDE1234F");
        assert_eq!(a.classification.category, DocumentCategory::TaxId);
        assert_eq!(a.fields.id_number().as_deref(), Some("ABCDE1234F"));
        assert_eq!(a.confidence, score::MAX_CONFIDENCE);
        assert_eq!(a.status, VerificationStatus::Verified);
        assert!(!a.upgraded_by_pattern);
    }

    #[test]
    fn aadhaar_without_name_is_verified() {
        let a = analyze("GOVT OF INDIA\n1234 5678 9012");
        assert_eq!(a.classification.category, DocumentCategory::NationalId);
        assert_eq!(a.fields.id_number().as_deref(), Some("1234 5678 9012"));
        assert_eq!(a.fields.name().display_value(), NOT_FOUND);
        assert_eq!(a.confidence, score::MAX_CONFIDENCE);
        assert_eq!(a.status, VerificationStatus::Verified);
    }

    #[test]
    fn empty_text_is_unknown_and_pending() {
        let a = analyze("");
        assert_eq!(a.classification.category, DocumentCategory::Unknown);
        assert_eq!(a.fields.id_number().display_value(), NOT_FOUND);
        assert_eq!(a.confidence, NEUTRAL_CERTAINTY);
        assert_eq!(a.status, VerificationStatus::Pending);
    }

    #[test]
    fn plain_prose_is_unknown_and_pending() {
        let a = analyze("the quick brown fox\njumps over the lazy dog");
        assert_eq!(a.classification.category, DocumentCategory::Unknown);
        assert!(!a.fields.is_set(Field::IdNumber));
        assert_eq!(a.status, VerificationStatus::Pending);
    }

    #[test]
    fn pattern_upgrades_unknown_category() {
        let a = analyze("some card\nABCDE1234F");
        assert_eq!(a.classification.category, DocumentCategory::TaxId);
        assert_eq!(a.classification.certainty, NEUTRAL_CERTAINTY);
        assert!(a.upgraded_by_pattern);
        // 0.50 + 0.10 is not above the threshold.
        assert_eq!(a.status, VerificationStatus::Pending);
    }

    #[test]
    fn pattern_never_overrides_keyword_category() {
        let a = analyze("ELECTION COMMISSION OF INDIA\n1234 5678 9012");
        assert_eq!(a.classification.category, DocumentCategory::VoterId);
        assert!(!a.upgraded_by_pattern);
    }

    #[test]
    fn unknown_with_id_and_name_is_verified() {
        let a = analyze("NAME JOHN DOE\n1234 5678 9012");
        assert_eq!(a.classification.category, DocumentCategory::NationalId);
        assert!((a.confidence - 0.70).abs() < 1e-9);
        assert_eq!(a.status, VerificationStatus::Verified);
    }
}
