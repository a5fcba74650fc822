// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text recognition boundary.
//
// The analysis pipeline treats OCR as a black box: an image path and a
// language hint go in, raw text comes out. Backends:
//
// - **Tesseract** (default): the system `tesseract` binary.
// - **ocrs** (feature `ocr`): pure-Rust engine, models loaded from disk.

pub mod tesseract;

#[cfg(feature = "ocr")]
pub mod ocr;

use std::path::Path;
use std::sync::Arc;

use docverify_core::config::{AnalysisConfig, RecognizerBackend};
use docverify_core::error::Result;

pub use tesseract::TesseractRecognizer;

/// Anything that can turn an image file into raw text.
///
/// Implementations are blocking and may be slow; async callers should run
/// them on a blocking thread.
pub trait TextRecognizer: Send + Sync {
    /// Short backend identifier for logs and notes (e.g. `"tesseract"`).
    fn name(&self) -> &'static str;

    /// Recognize all text in the image at `image_path`.
    fn recognize(&self, image_path: &Path, language: &str) -> Result<String>;
}

/// Build the recognizer selected by `config`.
pub fn recognizer_from_config(config: &AnalysisConfig) -> Result<Arc<dyn TextRecognizer>> {
    match config.recognizer {
        RecognizerBackend::Tesseract => Ok(Arc::new(TesseractRecognizer::new(
            config.tesseract_command.clone(),
        ))),
        RecognizerBackend::Ocrs => ocrs_from_config(config),
    }
}

#[cfg(feature = "ocr")]
fn ocrs_from_config(config: &AnalysisConfig) -> Result<Arc<dyn TextRecognizer>> {
    let ocr_config = match &config.model_dir {
        Some(dir) => ocr::OcrConfig::from_dir(dir),
        None => ocr::OcrConfig::default(),
    };
    Ok(Arc::new(ocr::OcrsRecognizer::new(ocr_config)?))
}

#[cfg(not(feature = "ocr"))]
fn ocrs_from_config(_config: &AnalysisConfig) -> Result<Arc<dyn TextRecognizer>> {
    Err(docverify_core::DocverifyError::RecognizerUnavailable(
        "the ocrs backend requires building with the `ocr` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_selects_tesseract() {
        let recognizer =
            recognizer_from_config(&AnalysisConfig::default()).expect("build recognizer");
        assert_eq!(recognizer.name(), "tesseract");
    }

    #[cfg(not(feature = "ocr"))]
    #[test]
    fn ocrs_without_feature_is_unavailable() {
        use docverify_core::DocverifyError;

        let config = AnalysisConfig {
            recognizer: RecognizerBackend::Ocrs,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            recognizer_from_config(&config),
            Err(DocverifyError::RecognizerUnavailable(_))
        ));
    }
}
