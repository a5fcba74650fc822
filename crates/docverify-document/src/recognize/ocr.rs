// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ocrs backend: pure-Rust OCR using neural network models executed via `rten`.
//
// # Feature Gate
//
// Only available with the `ocr` feature:
//
// ```toml
// docverify-document = { path = "crates/docverify-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine needs two model files, `text-detection.rten` and
// `text-recognition.rten`. Running the `ocrs-cli` tool once downloads them to
// the default cache directory, `$XDG_CACHE_HOME/ocrs` (typically
// `~/.cache/ocrs`).
//
// The `ocrs` models are script-agnostic Latin recognizers; the language hint
// is accepted for interface compatibility and otherwise ignored.

use std::path::{Path, PathBuf};

use docverify_core::error::{DocverifyError, Result};
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use super::TextRecognizer;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where to load the detection and recognition models from.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expects `dir` to contain `text-detection.rten` and `text-recognition.rten`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(DocverifyError::RecognizerUnavailable(format!(
                    "OCR model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Text recognizer backed by the `ocrs` engine.
///
/// Model loading is the expensive step; build one recognizer and share it
/// across pipeline runs.
pub struct OcrsRecognizer {
    engine: OcrsEngine,
}

impl OcrsRecognizer {
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading OCR models");
        let detection_model = load_model(&config.detection_model_path)?;
        let recognition_model = load_model(&config.recognition_model_path)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| {
            DocverifyError::RecognizerUnavailable(format!(
                "failed to initialise OCR engine: {}",
                err
            ))
        })?;

        info!("OCR engine initialised");
        Ok(Self { engine })
    }
}

fn load_model(path: &Path) -> Result<Model> {
    Model::load_file(path).map_err(|err| {
        DocverifyError::RecognizerUnavailable(format!(
            "failed to load model from {}: {}",
            path.display(),
            err
        ))
    })
}

impl TextRecognizer for OcrsRecognizer {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    #[instrument(skip(self, image_path), fields(path = %image_path.display()))]
    fn recognize(&self, image_path: &Path, language: &str) -> Result<String> {
        debug!(language, "ocrs ignores the language hint");

        let image = image::open(image_path).map_err(|err| {
            DocverifyError::Recognition(format!(
                "failed to open {}: {}",
                image_path.display(),
                err
            ))
        })?;
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            DocverifyError::Recognition(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;

        let input = self.engine.prepare_input(source).map_err(|err| {
            DocverifyError::Recognition(format!("OCR preprocessing failed: {}", err))
        })?;

        let text = self.engine.get_text(&input).map_err(|err| {
            DocverifyError::Recognition(format!("OCR text recognition failed: {}", err))
        })?;

        info!(
            line_count = text.lines().count(),
            text_len = text.len(),
            "OCR text recognized"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_dir() {
        let config = OcrConfig::from_dir("/tmp/my-models");
        assert_eq!(
            config.detection_model_path,
            PathBuf::from("/tmp/my-models/text-detection.rten")
        );
        assert_eq!(
            config.recognition_model_path,
            PathBuf::from("/tmp/my-models/text-recognition.rten")
        );
    }

    #[test]
    fn missing_models_are_unavailable() {
        let result = OcrsRecognizer::new(OcrConfig::from_dir("/nonexistent/ocr-models"));
        assert!(matches!(
            result,
            Err(DocverifyError::RecognizerUnavailable(_))
        ));
    }
}
