// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tesseract backend: shells out to the system `tesseract` binary.

use std::path::Path;
use std::process::Command;
use std::time::Instant;

use docverify_core::error::{DocverifyError, Result};
use tracing::{debug, info, instrument};

use super::TextRecognizer;

/// Runs `tesseract <image> stdout -l <language>` and returns its stdout.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    command: String,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractRecognizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    #[instrument(skip(self, image_path), fields(path = %image_path.display()))]
    fn recognize(&self, image_path: &Path, language: &str) -> Result<String> {
        let start = Instant::now();
        let output = Command::new(&self.command)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", language])
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocverifyError::RecognizerUnavailable(format!(
                    "{} not found (install tesseract-ocr)",
                    self.command
                )));
            }
            Err(e) => return Err(DocverifyError::Io(e)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocverifyError::Recognition(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "tesseract finished"
        );
        info!(text_len = text.len(), "OCR text recognized");
        Ok(text)
    }
}
