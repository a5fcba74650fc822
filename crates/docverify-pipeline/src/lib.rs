// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docverify-pipeline: runs the analysis stages for each uploaded document,
// off the upload path, and writes exactly one terminal update per document
// into the record store.

pub mod pipeline;
pub mod store;
pub mod worker;

pub use pipeline::AnalysisPipeline;
pub use store::{DocumentStore, SqliteDocumentStore};
pub use worker::{AnalysisJob, AnalysisWorker};
