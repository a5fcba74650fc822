// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for docverify: document records, classification,
// extracted fields, and the final analysis result.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DEFAULT_LANGUAGE;
use crate::error::DocverifyError;

/// Sentinel rendered for a field that was searched for and not found.
pub const NOT_FOUND: &str = "Not Found";

/// Certainty assigned when no keyword evidence was found.
pub const NEUTRAL_CERTAINTY: f64 = 0.50;

/// Confidence a freshly registered document carries until analysis completes.
pub const DEFAULT_CONFIDENCE: f64 = 0.0;

/// Unique identifier for an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = DocverifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| DocverifyError::Config(format!("invalid document id {s:?}: {e}")))
    }
}

/// What the submitter says they uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    IdProof,
    AddressProof,
    Photo,
}

/// Identity document categories recognised by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    /// Tax identification card (PAN).
    TaxId,
    /// National identity card (Aadhaar).
    NationalId,
    /// Voter identity card.
    VoterId,
    DrivingLicense,
    Unknown,
}

impl DocumentCategory {
    /// Human-readable label surfaced as `document_type`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TaxId => "PAN Card",
            Self::NationalId => "Aadhaar Card",
            Self::VoterId => "Voter ID",
            Self::DrivingLicense => "Driving License",
            Self::Unknown => "Unknown ID",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DocumentCategory {
    type Err = DocverifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "tax-id" | "pan" => Ok(Self::TaxId),
            "national-id" | "aadhaar" => Ok(Self::NationalId),
            "voter-id" | "voter" => Ok(Self::VoterId),
            "driving-license" | "dl" => Ok(Self::DrivingLicense),
            "unknown" => Ok(Self::Unknown),
            other => Err(DocverifyError::Config(format!(
                "unknown document category: {other}"
            ))),
        }
    }
}

/// Verification state of a document record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Analysis has been scheduled or is running.
    Processing,
    /// Waiting for a human reviewer.
    Pending,
    Verified,
    /// Only ever set by a human reviewer.
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = DocverifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processing" => Ok(Self::Processing),
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            other => Err(DocverifyError::InvalidStatus(format!(
                "unknown status: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis input
// ---------------------------------------------------------------------------

/// Everything one pipeline run needs to know about its document.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub document_id: DocumentId,
    pub image_path: PathBuf,
    /// Category the submitter claims, if any. Informational only.
    pub claimed_category: Option<DocumentCategory>,
    pub language: String,
}

impl AnalysisInput {
    pub fn new(document_id: DocumentId, image_path: impl Into<PathBuf>) -> Self {
        Self {
            document_id,
            image_path: image_path.into(),
            claimed_category: None,
            language: DEFAULT_LANGUAGE.to_owned(),
        }
    }

    pub fn with_claimed_category(mut self, category: Option<DocumentCategory>) -> Self {
        self.claimed_category = category;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// A chosen category plus how sure the classifier is about it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: DocumentCategory,
    pub certainty: f64,
}

impl ClassificationResult {
    pub fn new(category: DocumentCategory, certainty: f64) -> Self {
        Self {
            category,
            certainty: certainty.clamp(0.0, 1.0),
        }
    }

    /// No keyword evidence: unknown category at the neutral baseline.
    pub fn unknown() -> Self {
        Self::new(DocumentCategory::Unknown, NEUTRAL_CERTAINTY)
    }

    /// Promote an unknown classification to `category` (certainty is kept).
    ///
    /// Returns `false` and leaves `self` untouched when a category has
    /// already been decided.
    pub fn upgrade_from_unknown(&mut self, category: DocumentCategory) -> bool {
        if !self.category.is_unknown() || category.is_unknown() {
            return false;
        }
        self.category = category;
        true
    }
}

// ---------------------------------------------------------------------------
// Extracted fields
// ---------------------------------------------------------------------------

/// A field slot: either still unset or holding the first value written.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldValue {
    #[default]
    NotFound,
    Found(String),
}

impl FieldValue {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    /// The stored value, or [`NOT_FOUND`].
    pub fn display_value(&self) -> &str {
        self.as_deref().unwrap_or(NOT_FOUND)
    }
}

/// Named field slots with first-writer-wins semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    IdNumber,
    Name,
    DateOfBirth,
}

/// Structured fields pulled out of recognized text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    id_number: FieldValue,
    name: FieldValue,
    date_of_birth: FieldValue,
    /// Opportunistic `label -> value` pairs, keyed by lower-case
    /// underscore-joined label.
    labels: BTreeMap<String, String>,
}

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> &FieldValue {
        match field {
            Field::IdNumber => &self.id_number,
            Field::Name => &self.name,
            Field::DateOfBirth => &self.date_of_birth,
        }
    }

    pub fn is_set(&self, field: Field) -> bool {
        self.get(field).is_found()
    }

    /// Write `value` into `field` only if the slot is still unset.
    ///
    /// Returns whether the write happened.
    pub fn fill(&mut self, field: Field, value: impl Into<String>) -> bool {
        let slot = match field {
            Field::IdNumber => &mut self.id_number,
            Field::Name => &mut self.name,
            Field::DateOfBirth => &mut self.date_of_birth,
        };
        if slot.is_found() {
            return false;
        }
        *slot = FieldValue::Found(value.into());
        true
    }

    /// Record a generic label/value pair; the first value per key wins.
    pub fn fill_label(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        match self.labels.entry(key.into()) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
        }
    }

    pub fn id_number(&self) -> &FieldValue {
        &self.id_number
    }

    pub fn name(&self) -> &FieldValue {
        &self.name
    }

    pub fn date_of_birth(&self) -> &FieldValue {
        &self.date_of_birth
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }
}

// ---------------------------------------------------------------------------
// Analysis result
// ---------------------------------------------------------------------------

/// Whether the pipeline ran to completion or was cut short by a fatal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Completed,
    Failed,
}

/// The single artifact one pipeline run produces.
///
/// Fields are private: a result is built once by [`AnalysisResult::completed`]
/// or [`AnalysisResult::failed`] and only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    outcome: AnalysisOutcome,
    classification: ClassificationResult,
    fields: ExtractedFields,
    confidence: f64,
    status: VerificationStatus,
    raw_text: String,
    notes: String,
}

impl AnalysisResult {
    /// A result for a run whose every stage produced output.
    ///
    /// `status` must be `Pending` or `Verified`; anything else is recorded as
    /// `Pending`, since only reviewers may reject.
    pub fn completed(
        classification: ClassificationResult,
        fields: ExtractedFields,
        confidence: f64,
        status: VerificationStatus,
        raw_text: String,
        notes: String,
    ) -> Self {
        let status = match status {
            VerificationStatus::Verified => VerificationStatus::Verified,
            _ => VerificationStatus::Pending,
        };
        Self {
            outcome: AnalysisOutcome::Completed,
            classification,
            fields,
            confidence: confidence.clamp(0.0, 1.0),
            status,
            raw_text,
            notes,
        }
    }

    /// A degraded result: no text, unknown category, untouched confidence,
    /// left for a human reviewer.
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            outcome: AnalysisOutcome::Failed,
            classification: ClassificationResult::unknown(),
            fields: ExtractedFields::new(),
            confidence: DEFAULT_CONFIDENCE,
            status: VerificationStatus::Pending,
            raw_text: String::new(),
            notes: format!("AI processing failed: {reason}"),
        }
    }

    pub fn outcome(&self) -> AnalysisOutcome {
        self.outcome
    }

    pub fn classification(&self) -> &ClassificationResult {
        &self.classification
    }

    pub fn category(&self) -> DocumentCategory {
        self.classification.category
    }

    pub fn fields(&self) -> &ExtractedFields {
        &self.fields
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn status(&self) -> VerificationStatus {
        self.status
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Confidence as a whole-number percentage, e.g. `"99%"`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.0}%", self.confidence * 100.0)
    }

    /// The consumer-facing key/value view stored on the document record.
    ///
    /// Generic label pairs are included, but never shadow the fixed keys.
    pub fn extracted_data(&self) -> BTreeMap<String, String> {
        let mut data: BTreeMap<String, String> = self.fields.labels().clone();
        data.insert("document_type".into(), self.category().label().into());
        data.insert(
            "id_number".into(),
            self.fields.id_number().display_value().into(),
        );
        data.insert(
            "dob".into(),
            self.fields.date_of_birth().display_value().into(),
        );
        data.insert(
            "name_guess".into(),
            self.fields.name().display_value().into(),
        );
        data.insert("ai_confidence".into(), self.confidence_percent());
        data.insert("raw_text".into(), self.raw_text.clone());
        data
    }
}

// ---------------------------------------------------------------------------
// Document records
// ---------------------------------------------------------------------------

/// A persisted document and its latest verification state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    /// Opaque identifier of the submitting account.
    pub owner: String,
    pub kind: DocumentKind,
    pub file_path: PathBuf,
    pub original_name: String,
    pub mime_type: Option<String>,
    pub status: VerificationStatus,
    pub confidence: f64,
    pub extracted_data: Option<BTreeMap<String, String>>,
    pub admin_comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// A freshly uploaded document, about to be analysed.
    pub fn new(
        owner: impl Into<String>,
        kind: DocumentKind,
        file_path: impl Into<PathBuf>,
        original_name: impl Into<String>,
        mime_type: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            owner: owner.into(),
            kind,
            file_path: file_path.into(),
            original_name: original_name.into(),
            mime_type,
            status: VerificationStatus::Processing,
            confidence: DEFAULT_CONFIDENCE,
            extracted_data: None,
            admin_comments: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_is_first_writer_wins() {
        let mut fields = ExtractedFields::new();
        assert!(fields.fill(Field::Name, "JOHN DOE"));
        assert!(!fields.fill(Field::Name, "SOMEONE ELSE"));
        assert_eq!(fields.name().as_deref(), Some("JOHN DOE"));
    }

    #[test]
    fn unset_fields_render_sentinel() {
        let fields = ExtractedFields::new();
        assert_eq!(fields.id_number().display_value(), NOT_FOUND);
        assert!(!fields.is_set(Field::DateOfBirth));
    }

    #[test]
    fn generic_labels_keep_first_value() {
        let mut fields = ExtractedFields::new();
        assert!(fields.fill_label("father", "RAM KUMAR"));
        assert!(!fields.fill_label("father", "OTHER"));
        assert_eq!(fields.labels().get("father").map(String::as_str), Some("RAM KUMAR"));
    }

    #[test]
    fn upgrade_only_from_unknown() {
        let mut unknown = ClassificationResult::unknown();
        assert!(unknown.upgrade_from_unknown(DocumentCategory::TaxId));
        assert_eq!(unknown.category, DocumentCategory::TaxId);
        assert_eq!(unknown.certainty, NEUTRAL_CERTAINTY);

        let mut voter = ClassificationResult::new(DocumentCategory::VoterId, 0.9);
        assert!(!voter.upgrade_from_unknown(DocumentCategory::NationalId));
        assert_eq!(voter.category, DocumentCategory::VoterId);
    }

    #[test]
    fn failed_result_is_pending_with_default_confidence() {
        let result = AnalysisResult::failed("engine crashed");
        assert_eq!(result.outcome(), AnalysisOutcome::Failed);
        assert_eq!(result.status(), VerificationStatus::Pending);
        assert_eq!(result.confidence(), DEFAULT_CONFIDENCE);
        assert_eq!(result.category(), DocumentCategory::Unknown);
        assert!(result.raw_text().is_empty());
        assert!(result.notes().contains("engine crashed"));
    }

    #[test]
    fn completed_result_never_rejects() {
        let result = AnalysisResult::completed(
            ClassificationResult::unknown(),
            ExtractedFields::new(),
            0.5,
            VerificationStatus::Rejected,
            String::new(),
            String::new(),
        );
        assert_eq!(result.status(), VerificationStatus::Pending);
    }

    #[test]
    fn serialized_result_reflects_constructor_rules() {
        let result = AnalysisResult::completed(
            ClassificationResult::unknown(),
            ExtractedFields::new(),
            1.7,
            VerificationStatus::Rejected,
            String::new(),
            String::new(),
        );
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["confidence"], 1.0);
        assert_eq!(json["status"], serde_json::to_value(VerificationStatus::Pending).expect("status"));
    }

    #[test]
    fn extracted_data_fixed_keys_take_precedence() {
        let mut fields = ExtractedFields::new();
        fields.fill_label("dob", "from-label");
        fields.fill_label("father", "RAM KUMAR");
        fields.fill(Field::DateOfBirth, "01/01/1990");
        let result = AnalysisResult::completed(
            ClassificationResult::new(DocumentCategory::TaxId, 0.9),
            fields,
            0.99,
            VerificationStatus::Verified,
            "raw".into(),
            String::new(),
        );
        let data = result.extracted_data();
        assert_eq!(data["dob"], "01/01/1990");
        assert_eq!(data["father"], "RAM KUMAR");
        assert_eq!(data["document_type"], "PAN Card");
        assert_eq!(data["id_number"], NOT_FOUND);
        assert_eq!(data["name_guess"], NOT_FOUND);
        assert_eq!(data["ai_confidence"], "99%");
        assert_eq!(data["raw_text"], "raw");
    }

    #[test]
    fn category_parses_aliases() {
        assert_eq!("pan".parse::<DocumentCategory>().unwrap(), DocumentCategory::TaxId);
        assert_eq!(
            "driving_license".parse::<DocumentCategory>().unwrap(),
            DocumentCategory::DrivingLicense
        );
        assert!("passport".parse::<DocumentCategory>().is_err());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            VerificationStatus::Processing,
            VerificationStatus::Pending,
            VerificationStatus::Verified,
            VerificationStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<VerificationStatus>().unwrap(), status);
        }
    }
}
