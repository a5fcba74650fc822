// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for docverify.

use thiserror::Error;

use crate::types::DocumentId;

/// Top-level error type for all docverify operations.
#[derive(Debug, Error)]
pub enum DocverifyError {
    // -- Analysis stages --
    #[error("image processing failed: {0}")]
    Image(String),

    #[error("text recognition failed: {0}")]
    Recognition(String),

    #[error("text recognizer unavailable: {0}")]
    RecognizerUnavailable(String),

    #[error("analysis worker has shut down")]
    WorkerStopped,

    // -- Document records --
    #[error("database error: {0}")]
    Database(String),

    #[error("document {0} not found")]
    DocumentNotFound(DocumentId),

    #[error("invalid status transition: {0}")]
    InvalidStatus(String),

    // -- Configuration / I/O --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocverifyError>;
