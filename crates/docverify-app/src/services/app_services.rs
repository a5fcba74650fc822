// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: opens the record store and audit log, loads the
// analysis config, and owns the background analysis worker.
//
// The store guards its own connection. The audit log is shared with the
// worker behind `Arc<Mutex<>>`; contention is negligible because every
// operation is a sub-millisecond SQLite write.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use docverify_core::AnalysisConfig;
use docverify_core::error::{DocverifyError, Result};
use docverify_core::types::{
    AnalysisResult, DocumentCategory, DocumentId, DocumentKind, DocumentRecord,
    VerificationStatus,
};
use docverify_pipeline::{AnalysisPipeline, AnalysisWorker, DocumentStore, SqliteDocumentStore};
use docverify_security::audit::{ACTION_REVIEW, AuditEntry, AuditLog};
use docverify_security::integrity::hash_file;
use tracing::{error, info, warn};

const DOCUMENTS_DB: &str = "documents.db";
const AUDIT_DB: &str = "audit.db";

/// Backend services for one CLI invocation.
pub struct AppServices {
    store: Arc<SqliteDocumentStore>,
    audit_log: Arc<Mutex<AuditLog>>,
    /// `None` for in-memory services, which never persist config.
    data_dir: Option<PathBuf>,
    config: AnalysisConfig,
    worker: Option<AnalysisWorker>,
}

impl AppServices {
    /// Open the databases under `data_dir` and load the persisted config.
    pub fn init(data_dir: PathBuf) -> Result<Self> {
        info!(path = %data_dir.display(), "initialising services");

        let store = SqliteDocumentStore::open(data_dir.join(DOCUMENTS_DB))?;
        let audit_log = AuditLog::open(data_dir.join(AUDIT_DB))?;
        let config = load_config(&data_dir).unwrap_or_default();

        Ok(Self {
            store: Arc::new(store),
            audit_log: Arc::new(Mutex::new(audit_log)),
            data_dir: Some(data_dir),
            config,
            worker: None,
        })
    }

    /// Services backed by in-memory databases.
    pub fn in_memory(config: AnalysisConfig) -> Result<Self> {
        Ok(Self {
            store: Arc::new(SqliteDocumentStore::open_in_memory()?),
            audit_log: Arc::new(Mutex::new(AuditLog::open_in_memory()?)),
            data_dir: None,
            config,
            worker: None,
        })
    }

    // -- Analysis ------------------------------------------------------------

    /// Start the background worker with a pipeline built from the config.
    /// Must run inside a tokio runtime. No-op if already running.
    pub fn start_analysis(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let pipeline = AnalysisPipeline::from_config(&self.config)?;
        info!(recognizer = pipeline.recognizer_name(), "analysis pipeline ready");
        self.start_analysis_with(pipeline);
        Ok(())
    }

    /// Start the background worker around a prepared pipeline.
    pub fn start_analysis_with(&mut self, pipeline: AnalysisPipeline) {
        let audit = self
            .config
            .audit_enabled
            .then(|| Arc::clone(&self.audit_log));
        let worker = AnalysisWorker::start(Arc::new(pipeline), self.store.clone(), audit)
            .with_language(self.config.language.clone());
        self.worker = Some(worker);
    }

    /// Register an uploaded image and queue it for analysis.
    ///
    /// Returns as soon as the record exists; the analysis outcome lands in
    /// the record later.
    pub fn register_document(
        &self,
        image_path: &Path,
        owner: &str,
        kind: DocumentKind,
        claimed: Option<DocumentCategory>,
    ) -> Result<DocumentId> {
        let worker = self.worker.as_ref().ok_or(DocverifyError::WorkerStopped)?;

        // Surface a missing upload now rather than as an analysis failure.
        let image_path = std::fs::canonicalize(image_path)?;
        let image_path = image_path.as_path();

        let original_name = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = image::ImageFormat::from_path(image_path)
            .ok()
            .map(|format| format.to_mime_type().to_owned());

        let record = DocumentRecord::new(owner, kind, image_path, original_name, mime_type);
        self.store.insert_document(&record)?;
        if let Err(err) = worker.submit(record.id, image_path, claimed) {
            // Leave a pending record rather than one stuck in processing.
            error!(document_id = %record.id, error = %err, "analysis could not be queued");
            let failed = AnalysisResult::failed(&err);
            if let Err(e) = self.store.update_document_record(&record.id, &failed) {
                error!(document_id = %record.id, error = %e, "failed to store queueing failure");
            }
            return Err(err);
        }

        info!(document_id = %record.id, %owner, "document registered for analysis");
        Ok(record.id)
    }

    /// Wait for every queued analysis to finish.
    pub async fn finish(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown().await;
        }
    }

    // -- Records -------------------------------------------------------------

    pub fn document(&self, id: &DocumentId) -> Result<DocumentRecord> {
        self.store
            .get_document(id)?
            .ok_or(DocverifyError::DocumentNotFound(*id))
    }

    /// All documents, or one owner's, newest first.
    pub fn documents(&self, owner: Option<&str>) -> Result<Vec<DocumentRecord>> {
        match owner {
            Some(owner) => self.store.documents_for_owner(owner),
            None => self.store.all_documents(),
        }
    }

    pub fn review_queue(&self) -> Result<Vec<DocumentRecord>> {
        self.store.review_queue()
    }

    /// Record a reviewer's verdict and audit it.
    pub fn review(
        &self,
        id: &DocumentId,
        status: VerificationStatus,
        comment: Option<&str>,
    ) -> Result<DocumentRecord> {
        self.store.record_review(id, status, comment)?;
        let record = self.document(id)?;

        if self.config.audit_enabled {
            let fingerprint = hash_file(&record.file_path).unwrap_or_else(|e| {
                warn!(document_id = %id, error = %e, "upload unreadable; auditing by id");
                id.to_string()
            });
            let details = match comment {
                Some(comment) => format!("{status}: {comment}"),
                None => status.to_string(),
            };
            self.audit(ACTION_REVIEW, id, &fingerprint, true, Some(&details));
        }
        Ok(record)
    }

    // -- Audit Trail ---------------------------------------------------------

    /// Record an audit entry (convenience wrapper).
    fn audit(
        &self,
        action: &str,
        id: &DocumentId,
        fingerprint: &str,
        success: bool,
        details: Option<&str>,
    ) {
        if let Ok(log) = self.audit_log.lock()
            && let Err(e) = log.record(action, id, fingerprint, success, details)
        {
            error!(error = %e, "failed to record audit entry");
        }
    }

    fn audit_log(&self) -> Result<std::sync::MutexGuard<'_, AuditLog>> {
        self.audit_log
            .lock()
            .map_err(|_| DocverifyError::Database("audit log lock poisoned".into()))
    }

    pub fn recent_audit_entries(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        self.audit_log()?.recent_entries(limit)
    }

    pub fn audit_entries_for_document(&self, id: &DocumentId) -> Result<Vec<AuditEntry>> {
        self.audit_log()?.entries_for_document(id)
    }

    pub fn audit_count(&self) -> Result<u64> {
        self.audit_log()?.count()
    }

    // -- Config Persistence --------------------------------------------------

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Replace and persist the config. Takes effect for the next worker.
    pub fn save_config(&mut self, config: AnalysisConfig) -> Result<()> {
        if let Some(dir) = &self.data_dir {
            persist_config(dir, &config)?;
        }
        self.config = config;
        Ok(())
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }
}

// -- Config file persistence -------------------------------------------------

const CONFIG_FILE: &str = "config.json";

fn load_config(data_dir: &Path) -> Option<AnalysisConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &AnalysisConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
