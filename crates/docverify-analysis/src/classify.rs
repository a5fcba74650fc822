// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Keyword classifier.
//
// Each category has a fixed keyword set. Sets are tested in priority order
// against the upper-cased text and the first set with any hit wins, so a
// card mentioning both "INCOME TAX" and "GOVT OF INDIA" is a PAN card.

use docverify_core::types::{ClassificationResult, DocumentCategory};
use tracing::debug;

/// Certainty assigned to any keyword match.
pub const KEYWORD_CERTAINTY: f64 = 0.90;

struct KeywordRule {
    category: DocumentCategory,
    keywords: &'static [&'static str],
}

/// Priority order matters: earlier rules win ties.
static RULES: &[KeywordRule] = &[
    KeywordRule {
        category: DocumentCategory::TaxId,
        keywords: &["INCOME TAX", "PERMANENT ACCOUNT", "PAN CARD"],
    },
    KeywordRule {
        category: DocumentCategory::NationalId,
        keywords: &["AADHAAR", "GOVT OF INDIA", "UNIQUE IDENTIFICATION"],
    },
    KeywordRule {
        category: DocumentCategory::VoterId,
        keywords: &["ELECTION", "VOTER", "IDENTITY CARD"],
    },
    KeywordRule {
        category: DocumentCategory::DrivingLicense,
        keywords: &["DRIVING", "LICENSE"],
    },
];

/// Why a category was chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub result: ClassificationResult,
    /// The keyword that decided the category, if any.
    pub matched_keyword: Option<&'static str>,
}

/// Classify raw recognized text by keyword evidence.
///
/// No match yields [`DocumentCategory::Unknown`] at the neutral baseline.
pub fn classify(raw_text: &str) -> Classification {
    let upper = raw_text.to_uppercase();

    for rule in RULES {
        if let Some(keyword) = rule.keywords.iter().copied().find(|kw| upper.contains(kw)) {
            debug!(category = ?rule.category, keyword, "Keyword match");
            return Classification {
                result: ClassificationResult::new(rule.category, KEYWORD_CERTAINTY),
                matched_keyword: Some(keyword),
            };
        }
    }

    debug!("No keyword match");
    Classification {
        result: ClassificationResult::unknown(),
        matched_keyword: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docverify_core::types::NEUTRAL_CERTAINTY;

    #[test]
    fn income_tax_is_pan_card() {
        let c = classify("INCOME TAX DEPARTMENT\nGOVT. OF INDIA");
        assert_eq!(c.result.category, DocumentCategory::TaxId);
        assert_eq!(c.result.certainty, KEYWORD_CERTAINTY);
        assert_eq!(c.matched_keyword, Some("INCOME TAX"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let c = classify("Government of India\nAadhaar - Aam Aadmi ka Adhikar");
        assert_eq!(c.result.category, DocumentCategory::NationalId);
    }

    #[test]
    fn tax_keywords_beat_national_keywords() {
        let c = classify("GOVT OF INDIA\nPERMANENT ACCOUNT NUMBER");
        assert_eq!(c.result.category, DocumentCategory::TaxId);
    }

    #[test]
    fn voter_beats_driving_license() {
        let c = classify("ELECTION COMMISSION OF INDIA\nDRIVING LICENSE");
        assert_eq!(c.result.category, DocumentCategory::VoterId);
    }

    #[test]
    fn driving_license_detected() {
        let c = classify("Union of India\nDriving Licence / LICENSE NO");
        assert_eq!(c.result.category, DocumentCategory::DrivingLicense);
    }

    #[test]
    fn no_keywords_is_unknown_baseline() {
        for text in ["", "hello world\nnothing to see", "12 MAIN STREET"] {
            let c = classify(text);
            assert_eq!(c.result.category, DocumentCategory::Unknown);
            assert_eq!(c.result.certainty, NEUTRAL_CERTAINTY);
            assert!(c.matched_keyword.is_none());
        }
    }
}
