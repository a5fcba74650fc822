// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Analysis pipeline: preprocess, recognize, classify, extract, score.
//
// Stage failure policy:
//   preprocess  -> note it, recognize the original image instead
//   recognize   -> stop, return a failed (pending, untouched confidence) result
//   text stages -> cannot fail
//
// `run` always returns a result; nothing propagates out of it.

use std::sync::Arc;

use docverify_analysis::{RecognizedText, analyze_text};
use docverify_core::config::AnalysisConfig;
use docverify_core::error::Result;
use docverify_core::types::{AnalysisInput, AnalysisResult};
use docverify_document::{ImagePreprocessor, TextRecognizer, recognizer_from_config};
use tracing::{info, instrument, warn};

/// Sequences the analysis stages for one document at a time.
///
/// Holds no per-run state, so one pipeline can be shared by any number of
/// concurrent runs.
pub struct AnalysisPipeline {
    /// `None` when image enhancement is disabled.
    preprocessor: Option<ImagePreprocessor>,
    recognizer: Arc<dyn TextRecognizer>,
}

impl AnalysisPipeline {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            preprocessor: Some(ImagePreprocessor::new()),
            recognizer,
        }
    }

    /// Build the recognizer and enhancement settings from `config`.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        let recognizer = recognizer_from_config(config)?;
        let pipeline = Self::new(recognizer);
        Ok(if config.enhance_images {
            pipeline
        } else {
            pipeline.without_enhancement()
        })
    }

    /// Hand the original image straight to the recognizer.
    pub fn without_enhancement(mut self) -> Self {
        self.preprocessor = None;
        self
    }

    pub fn recognizer_name(&self) -> &'static str {
        self.recognizer.name()
    }

    /// Analyse one document. Blocking; may take seconds for OCR.
    #[instrument(skip_all, fields(document_id = %input.document_id, path = %input.image_path.display()))]
    pub fn run(&self, input: &AnalysisInput) -> AnalysisResult {
        info!(recognizer = self.recognizer.name(), "Starting document analysis");
        let mut notes: Vec<String> = Vec::new();

        let processed = match &self.preprocessor {
            Some(preprocessor) => match preprocessor.preprocess(input.image_path()) {
                Ok(processed) => {
                    notes.push("Processed with image enhancement".into());
                    Some(processed)
                }
                Err(err) => {
                    warn!(error = %err, "Preprocessing failed; recognizing original image");
                    notes.push(format!("Image enhancement skipped ({err})"));
                    None
                }
            },
            None => {
                notes.push("Image enhancement disabled".into());
                None
            }
        };

        let ocr_path = processed
            .as_ref()
            .map_or(input.image_path(), |processed| processed.path());

        let raw = match self.recognizer.recognize(ocr_path, &input.language) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "Text recognition failed");
                return AnalysisResult::failed(err);
            }
        };
        // Done with the enhanced copy.
        drop(processed);

        let text = RecognizedText::new(raw);
        if text.is_empty() {
            notes.push("No text recognized".into());
        }

        let analysis = analyze_text(&text);
        let detected = analysis.classification.category;

        notes.push(format!("Type: {}", detected.label()));
        if analysis.upgraded_by_pattern {
            notes.push("Type inferred from identifier format only".into());
        }
        if let Some(claimed) = input.claimed_category
            && claimed != detected
            && !detected.is_unknown()
        {
            notes.push(format!(
                "Claimed {} but detected {}",
                claimed.label(),
                detected.label()
            ));
        }

        info!(
            category = detected.label(),
            confidence = analysis.confidence,
            status = %analysis.status,
            "Document analysis complete"
        );

        AnalysisResult::completed(
            analysis.classification,
            analysis.fields,
            analysis.confidence,
            analysis.status,
            text.into_raw(),
            notes.join(". "),
        )
    }
}
