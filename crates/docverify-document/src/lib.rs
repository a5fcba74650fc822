// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docverify-document: everything between an uploaded image file and raw
// recognized text.
//
// Provides image enhancement for OCR (greyscale, contrast, brightness,
// maximum-quality re-encode to a scoped sibling file) and the text-recognition
// boundary with its Tesseract and `ocrs` backends.

pub mod image;
pub mod recognize;

pub use image::preprocess::{ImagePreprocessor, ProcessedImage};
pub use recognize::{TextRecognizer, TesseractRecognizer, recognizer_from_config};

#[cfg(feature = "ocr")]
pub use recognize::ocr::OcrsRecognizer;
