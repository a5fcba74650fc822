// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image preprocessor: greyscale, contrast boost, brightness boost and a
// maximum-quality JPEG re-encode, written next to the source image so the
// text recognizer has an easier time with phone photos of ID cards.
//
// The processed file only lives as long as its `ProcessedImage` guard.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use docverify_core::error::{DocverifyError, Result};
use image::{DynamicImage, GrayImage, ImageReader};
use tracing::{debug, info, instrument, warn};

/// Appended to the source path to name the processed image.
pub const PROCESSED_SUFFIX: &str = "_processed.jpg";

/// Contrast factor about mid-grey (a 50% contrast increase in the usual
/// -1..1 slider terms).
pub const CONTRAST_FACTOR: f32 = 3.0;

/// Fraction of the remaining headroom each pixel moves toward white.
pub const BRIGHTNESS_BOOST: f32 = 0.1;

pub const JPEG_QUALITY: u8 = 100;

/// Enhances an uploaded document image for text recognition.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    contrast: f32,
    brightness: f32,
    quality: u8,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self {
            contrast: CONTRAST_FACTOR,
            brightness: BRIGHTNESS_BOOST,
            quality: JPEG_QUALITY,
        }
    }
}

impl ImagePreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the processed copy of `source` is written.
    ///
    /// Derived from the source path alone, so two documents never share a
    /// processed file.
    pub fn processed_path_for(source: &Path) -> PathBuf {
        let mut name = OsString::from(source.as_os_str());
        name.push(PROCESSED_SUFFIX);
        PathBuf::from(name)
    }

    /// Decode `source`, enhance it, and write the result to
    /// [`processed_path_for`](Self::processed_path_for).
    ///
    /// The returned guard deletes the processed file when dropped. A source
    /// that cannot be decoded yields [`DocverifyError::Image`] and writes
    /// nothing.
    #[instrument(skip_all, fields(path = %source.as_ref().display()))]
    pub fn preprocess(&self, source: impl AsRef<Path>) -> Result<ProcessedImage> {
        let source = source.as_ref();
        let image = decode(source)?;
        info!(
            width = image.width(),
            height = image.height(),
            "Source image decoded"
        );

        let enhanced = self.enhance(&image);
        let bytes = encode_jpeg(&enhanced, self.quality)?;

        // Guard first, so a partial write is cleaned up too.
        let processed = ProcessedImage {
            path: Self::processed_path_for(source),
        };
        std::fs::write(processed.path(), bytes)?;

        info!(processed = %processed.path().display(), "Image pre-processed");
        Ok(processed)
    }

    /// The in-memory part of [`preprocess`](Self::preprocess).
    pub fn enhance(&self, image: &DynamicImage) -> GrayImage {
        let gray = image.to_luma8();
        let gray = adjust_contrast(gray, self.contrast);
        adjust_brightness(gray, self.brightness)
    }
}

/// A processed image on disk, deleted when this guard goes out of scope.
#[derive(Debug)]
pub struct ProcessedImage {
    path: PathBuf,
}

impl ProcessedImage {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProcessedImage {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Processed image removed"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                path = %self.path.display(),
                error = %err,
                "Failed to remove processed image"
            ),
        }
    }
}

/// Decode by content rather than extension; uploads are often stored without one.
fn decode(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|err| {
            DocverifyError::Image(format!("failed to open {}: {}", path.display(), err))
        })?;
    reader.decode().map_err(|err| {
        DocverifyError::Image(format!("failed to decode {}: {}", path.display(), err))
    })
}

fn adjust_contrast(mut gray: GrayImage, factor: f32) -> GrayImage {
    debug!(factor, "Adjusting contrast");
    for pixel in gray.pixels_mut() {
        let val = factor * (pixel.0[0] as f32 - 128.0) + 128.0;
        pixel.0[0] = val.clamp(0.0, 255.0) as u8;
    }
    gray
}

fn adjust_brightness(mut gray: GrayImage, amount: f32) -> GrayImage {
    debug!(amount, "Adjusting brightness");
    for pixel in gray.pixels_mut() {
        let val = pixel.0[0] as f32;
        let val = val + (255.0 - val) * amount;
        pixel.0[0] = val.round().clamp(0.0, 255.0) as u8;
    }
    gray
}

fn encode_jpeg(gray: &GrayImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    gray.write_with_encoder(encoder)
        .map_err(|err| DocverifyError::Image(format!("JPEG encoding failed: {}", err)))?;
    Ok(buffer)
}
