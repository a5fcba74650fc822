// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background analysis worker.
//
// Uploads hand a document to `submit` and return at once. A dispatcher task
// turns every submission into its own tokio task: mark the record as
// processing, run the pipeline on the blocking pool, write the single
// terminal update, append an audit entry. Runs are independent and unordered.
//
// Nothing escapes a run. Store and audit failures are logged and dropped; a
// pipeline panic becomes a failed result so the record never stays stuck in
// processing.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use docverify_core::config::DEFAULT_LANGUAGE;
use docverify_core::error::{DocverifyError, Result};
use docverify_core::types::{
    AnalysisInput, AnalysisOutcome, AnalysisResult, DocumentCategory, DocumentId,
};
use docverify_security::audit::{ACTION_ANALYSIS_COMPLETED, ACTION_ANALYSIS_FAILED, AuditLog};
use docverify_security::integrity::hash_file;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::pipeline::AnalysisPipeline;
use crate::store::DocumentStore;

/// One queued analysis request.
pub type AnalysisJob = AnalysisInput;

/// Shared by every run.
struct WorkerContext {
    pipeline: Arc<AnalysisPipeline>,
    store: Arc<dyn DocumentStore>,
    audit: Option<Arc<Mutex<AuditLog>>>,
}

/// Handle to the background analysis dispatcher.
pub struct AnalysisWorker {
    sender: mpsc::UnboundedSender<AnalysisJob>,
    dispatcher: JoinHandle<()>,
    language: String,
}

impl AnalysisWorker {
    /// Spawn the dispatcher. Must be called from within a tokio runtime.
    ///
    /// Pass `None` for `audit` to skip the audit trail.
    pub fn start(
        pipeline: Arc<AnalysisPipeline>,
        store: Arc<dyn DocumentStore>,
        audit: Option<Arc<Mutex<AuditLog>>>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let context = Arc::new(WorkerContext {
            pipeline,
            store,
            audit,
        });
        let dispatcher = tokio::spawn(dispatch(receiver, context));

        info!("analysis worker started");
        Self {
            sender,
            dispatcher,
            language: DEFAULT_LANGUAGE.to_owned(),
        }
    }

    /// Recognition language used for documents queued through [`submit`](Self::submit).
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Queue a document for analysis. Never blocks.
    pub fn submit(
        &self,
        document_id: DocumentId,
        image_path: impl Into<PathBuf>,
        claimed_category: Option<DocumentCategory>,
    ) -> Result<()> {
        let job = AnalysisInput::new(document_id, image_path)
            .with_claimed_category(claimed_category)
            .with_language(self.language.clone());
        self.submit_job(job)
    }

    /// Queue a fully specified job.
    pub fn submit_job(&self, job: AnalysisJob) -> Result<()> {
        let document_id = job.document_id;
        self.sender
            .send(job)
            .map_err(|_| DocverifyError::WorkerStopped)?;
        debug!(%document_id, "analysis job queued");
        Ok(())
    }

    /// Stop accepting jobs and wait for every in-flight run to finish.
    pub async fn shutdown(self) {
        let Self {
            sender, dispatcher, ..
        } = self;
        drop(sender);
        if let Err(err) = dispatcher.await {
            error!(error = %err, "analysis dispatcher aborted");
        }
        info!("analysis worker stopped");
    }
}

async fn dispatch(mut receiver: mpsc::UnboundedReceiver<AnalysisJob>, context: Arc<WorkerContext>) {
    let mut runs = JoinSet::new();

    loop {
        tokio::select! {
            job = receiver.recv() => match job {
                Some(job) => {
                    runs.spawn(run_job(Arc::clone(&context), job));
                }
                None => break,
            },
            Some(joined) = runs.join_next(), if !runs.is_empty() => reap(joined),
        }
    }

    debug!(in_flight = runs.len(), "job channel closed; draining runs");
    while let Some(joined) = runs.join_next().await {
        reap(joined);
    }
}

fn reap(joined: std::result::Result<(), JoinError>) {
    if let Err(err) = joined {
        error!(error = %err, "analysis task aborted");
    }
}

async fn run_job(context: Arc<WorkerContext>, job: AnalysisJob) {
    let document_id = job.document_id;

    let run_context = Arc::clone(&context);
    let run = tokio::task::spawn_blocking(move || analyse(&run_context, &job)).await;

    let (result, fingerprint) = match run {
        Ok(output) => output,
        Err(err) => {
            error!(%document_id, error = %err, "analysis run did not complete");
            (
                AnalysisResult::failed(format!("analysis task aborted ({err})")),
                None,
            )
        }
    };

    let finish =
        tokio::task::spawn_blocking(move || finish(&context, &document_id, &result, fingerprint))
            .await;
    if let Err(err) = finish {
        error!(%document_id, error = %err, "storing analysis result aborted");
    }
}

/// Blocking half of a run: mark, fingerprint, analyse.
fn analyse(context: &WorkerContext, job: &AnalysisJob) -> (AnalysisResult, Option<String>) {
    let document_id = job.document_id;
    if let Err(err) = context.store.mark_processing(&document_id) {
        warn!(%document_id, error = %err, "failed to mark document processing");
    }

    let fingerprint = context.audit.is_some().then(|| {
        hash_file(job.image_path()).unwrap_or_else(|_| document_id.to_string())
    });
    (context.pipeline.run(job), fingerprint)
}

/// Terminal update and audit entry. Blocking.
fn finish(
    context: &WorkerContext,
    document_id: &DocumentId,
    result: &AnalysisResult,
    fingerprint: Option<String>,
) {
    match context.store.update_document_record(document_id, result) {
        Ok(()) => info!(
            %document_id,
            status = %result.status(),
            confidence = result.confidence(),
            "analysis finished"
        ),
        Err(err) => error!(%document_id, error = %err, "failed to store analysis result"),
    }

    if let Some(audit) = &context.audit {
        let fingerprint = fingerprint.unwrap_or_else(|| document_id.to_string());
        record_audit(audit, document_id, &fingerprint, result);
    }
}

fn record_audit(
    audit: &Mutex<AuditLog>,
    document_id: &DocumentId,
    fingerprint: &str,
    result: &AnalysisResult,
) {
    let (action, success, details) = match result.outcome() {
        AnalysisOutcome::Completed => (
            ACTION_ANALYSIS_COMPLETED,
            true,
            format!(
                "{} {} {}",
                result.category().label(),
                result.confidence_percent(),
                result.status()
            ),
        ),
        AnalysisOutcome::Failed => (ACTION_ANALYSIS_FAILED, false, result.notes().to_owned()),
    };

    let Ok(log) = audit.lock() else {
        error!(%document_id, "audit log lock poisoned");
        return;
    };
    if let Err(err) = log.record(action, document_id, fingerprint, success, Some(&details)) {
        error!(%document_id, error = %err, "failed to record audit entry");
    }
}
