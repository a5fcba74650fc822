// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: OCR-oriented enhancement of uploaded document photos.

pub mod preprocess;

pub use preprocess::{ImagePreprocessor, ProcessedImage};
