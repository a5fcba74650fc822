// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Confidence scoring and the verified/pending decision.

use docverify_core::types::VerificationStatus;

/// Added when an identifier number was extracted.
pub const ID_BONUS: f64 = 0.10;

/// Added when a holder name was extracted.
pub const NAME_BONUS: f64 = 0.10;

/// Confidence never reaches 1.0: this is a heuristic estimate.
pub const MAX_CONFIDENCE: f64 = 0.99;

/// Confidence must be strictly above this to auto-verify.
pub const VERIFY_THRESHOLD: f64 = 0.60;

/// Combine classifier certainty with extraction completeness.
///
/// Always within `[0, MAX_CONFIDENCE]`.
pub fn score(certainty: f64, has_id_number: bool, has_name: bool) -> f64 {
    let mut confidence = certainty;
    if has_id_number {
        confidence += ID_BONUS;
    }
    if has_name {
        confidence += NAME_BONUS;
    }
    if confidence.is_nan() {
        return 0.0;
    }
    confidence.clamp(0.0, MAX_CONFIDENCE)
}

/// Map a confidence to an outcome. Low scores go to a reviewer; the pipeline
/// never rejects.
pub fn status_for(confidence: f64) -> VerificationStatus {
    if confidence > VERIFY_THRESHOLD {
        VerificationStatus::Verified
    } else {
        VerificationStatus::Pending
    }
}
