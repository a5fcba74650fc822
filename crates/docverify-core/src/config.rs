// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Analysis configuration.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DocverifyError, Result};

/// Language hint handed to the text recognizer when none is configured.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Which text-recognition backend the pipeline hands images to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognizerBackend {
    /// The system `tesseract` binary.
    Tesseract,
    /// The pure-Rust `ocrs` engine (requires the `ocr` feature).
    Ocrs,
}

impl FromStr for RecognizerBackend {
    type Err = DocverifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tesseract" => Ok(Self::Tesseract),
            "ocrs" => Ok(Self::Ocrs),
            other => Err(DocverifyError::Config(format!(
                "unknown recognizer {other:?} (expected tesseract or ocrs)"
            ))),
        }
    }
}

/// Persistent analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Language hint passed to the recognizer (Tesseract language code).
    pub language: String,
    /// Recognition backend.
    pub recognizer: RecognizerBackend,
    /// Command used to invoke Tesseract.
    pub tesseract_command: String,
    /// Directory holding the `ocrs` detection/recognition models. `None`
    /// uses the default model cache.
    pub model_dir: Option<PathBuf>,
    /// Run greyscale/contrast/brightness enhancement before recognition.
    pub enhance_images: bool,
    /// Record analysis and review outcomes in the audit trail.
    pub audit_enabled: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_owned(),
            recognizer: RecognizerBackend::Tesseract,
            tesseract_command: "tesseract".to_owned(),
            model_dir: None,
            enhance_images: true,
            audit_enabled: true,
        }
    }
}

impl AnalysisConfig {
    /// Setting names accepted by [`set`](Self::set).
    pub const KEYS: &[&str] = &[
        "language",
        "recognizer",
        "tesseract_command",
        "model_dir",
        "enhance_images",
        "audit_enabled",
    ];

    /// Update one setting from its textual form. An empty `model_dir`
    /// clears it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "language" if !value.is_empty() => self.language = value.to_owned(),
            "recognizer" => self.recognizer = value.parse()?,
            "tesseract_command" if !value.is_empty() => {
                self.tesseract_command = value.to_owned()
            }
            "model_dir" => {
                self.model_dir = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "enhance_images" => self.enhance_images = parse_flag(key, value)?,
            "audit_enabled" => self.audit_enabled = parse_flag(key, value)?,
            "language" | "tesseract_command" => {
                return Err(DocverifyError::Config(format!("{key} cannot be empty")));
            }
            other => {
                return Err(DocverifyError::Config(format!(
                    "unknown setting {other:?} (expected one of: {})",
                    Self::KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(DocverifyError::Config(format!(
            "{key} expects true or false, got {value:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "language": "hin", "recognizer": "ocrs" }"#)
                .expect("parse partial config");
        assert_eq!(config.language, "hin");
        assert_eq!(config.recognizer, RecognizerBackend::Ocrs);
        assert_eq!(config.tesseract_command, "tesseract");
        assert!(config.enhance_images);
        assert!(config.audit_enabled);
    }

    #[test]
    fn default_language_is_english() {
        assert_eq!(AnalysisConfig::default().language, DEFAULT_LANGUAGE);
    }

    #[test]
    fn set_updates_each_key() {
        let mut config = AnalysisConfig::default();
        config.set("language", "hin").expect("language");
        config.set("recognizer", "OCRS").expect("recognizer");
        config.set("model_dir", "/opt/models").expect("model_dir");
        config.set("enhance_images", "off").expect("enhance_images");
        config.set("audit_enabled", "no").expect("audit_enabled");

        assert_eq!(config.language, "hin");
        assert_eq!(config.recognizer, RecognizerBackend::Ocrs);
        assert_eq!(config.model_dir, Some(PathBuf::from("/opt/models")));
        assert!(!config.enhance_images);
        assert!(!config.audit_enabled);

        config.set("model_dir", "").expect("clear model_dir");
        assert_eq!(config.model_dir, None);
    }

    #[test]
    fn set_rejects_bad_input() {
        let mut config = AnalysisConfig::default();
        assert!(config.set("colour", "blue").is_err());
        assert!(config.set("recognizer", "easyocr").is_err());
        assert!(config.set("enhance_images", "maybe").is_err());
        assert!(config.set("language", "  ").is_err());
        assert_eq!(config.language, DEFAULT_LANGUAGE);
    }
}
