// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persistent document records backed by SQLite.
//
// Only metadata and analysis output live here; the uploaded image itself
// stays on disk at `file_path`. The analysis worker talks to the store
// through the narrow `DocumentStore` trait so tests can swap in a fake.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use tracing::{debug, info, instrument, warn};

use docverify_core::error::{DocverifyError, Result};
use docverify_core::types::{
    AnalysisResult, DocumentId, DocumentKind, DocumentRecord, VerificationStatus,
};

/// SQLite schema for the documents table.
const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        owner TEXT NOT NULL,
        kind TEXT NOT NULL,
        file_path TEXT NOT NULL,
        original_name TEXT NOT NULL,
        mime_type TEXT,
        status TEXT NOT NULL,
        confidence REAL NOT NULL DEFAULT 0.0,
        extracted_data TEXT,
        admin_comments TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(owner);
    CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status);
"#;

const SELECT_COLUMNS: &str = "SELECT id, owner, kind, file_path, original_name, mime_type,
        status, confidence, extracted_data, admin_comments, created_at, updated_at
 FROM documents";

/// What the analysis worker needs from the record store.
pub trait DocumentStore: Send + Sync {
    /// Flag a document as under analysis.
    fn mark_processing(&self, id: &DocumentId) -> Result<()>;

    /// Write the terminal outcome of an analysis run.
    fn update_document_record(&self, id: &DocumentId, result: &AnalysisResult) -> Result<()>;
}

fn db_err(context: &str) -> impl FnOnce(rusqlite::Error) -> DocverifyError + '_ {
    move |e| DocverifyError::Database(format!("{context}: {e}"))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| DocverifyError::Database(format!("serialize {what}: {e}")))
}

/// Document record store backed by a SQLite database.
///
/// Calls are synchronous and short; the connection sits behind a mutex so
/// one store can be shared between the request path and the worker.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open (or create) the document database at `path`, in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_err("open"))?;

        // The worker writes while the CLI or a reviewer reads.
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err("WAL pragma"))?;

        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(db_err("create table"))?;

        info!("document database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err("open in-memory"))?;
        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(db_err("create table"))?;

        debug!("in-memory document database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DocverifyError::Database("document store lock poisoned".into()))
    }

    /// Insert a freshly uploaded document.
    #[instrument(skip(self, record), fields(document_id = %record.id))]
    pub fn insert_document(&self, record: &DocumentRecord) -> Result<()> {
        let kind_json = to_json(&record.kind, "kind")?;
        let status_json = to_json(&record.status, "status")?;
        let data_json = record
            .extracted_data
            .as_ref()
            .map(|data| to_json(data, "extracted_data"))
            .transpose()?;

        self.conn()?
            .execute(
                "INSERT INTO documents (id, owner, kind, file_path, original_name, mime_type,
                 status, confidence, extracted_data, admin_comments, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.id.to_string(),
                    record.owner,
                    kind_json,
                    record.file_path.to_string_lossy().into_owned(),
                    record.original_name,
                    record.mime_type,
                    status_json,
                    record.confidence,
                    data_json,
                    record.admin_comments,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .map_err(db_err("insert document"))?;

        info!(document_id = %record.id, owner = %record.owner, "document inserted");
        Ok(())
    }

    /// Retrieve a single document. `None` if it does not exist.
    #[instrument(skip(self), fields(document_id = %id))]
    pub fn get_document(&self, id: &DocumentId) -> Result<Option<DocumentRecord>> {
        let mut records = self.query(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            params![id.to_string()],
        )?;
        Ok(records.pop())
    }

    /// All documents, newest first.
    pub fn all_documents(&self) -> Result<Vec<DocumentRecord>> {
        self.query(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC"), [])
    }

    /// One owner's documents, newest first.
    pub fn documents_for_owner(&self, owner: &str) -> Result<Vec<DocumentRecord>> {
        self.query(
            &format!("{SELECT_COLUMNS} WHERE owner = ?1 ORDER BY created_at DESC"),
            params![owner],
        )
    }

    /// Documents waiting on a human: pending or rejected, newest first.
    pub fn review_queue(&self) -> Result<Vec<DocumentRecord>> {
        let pending = to_json(&VerificationStatus::Pending, "status")?;
        let rejected = to_json(&VerificationStatus::Rejected, "status")?;
        let records = self.query(
            &format!("{SELECT_COLUMNS} WHERE status IN (?1, ?2) ORDER BY created_at DESC"),
            params![pending, rejected],
        )?;
        debug!(count = records.len(), "review queue loaded");
        Ok(records)
    }

    /// Apply a reviewer decision. Only `Verified` and `Rejected` are accepted,
    /// and only once analysis has finished with the document.
    #[instrument(skip(self, comments), fields(document_id = %id, %status))]
    pub fn record_review(
        &self,
        id: &DocumentId,
        status: VerificationStatus,
        comments: Option<&str>,
    ) -> Result<()> {
        if !matches!(
            status,
            VerificationStatus::Verified | VerificationStatus::Rejected
        ) {
            return Err(DocverifyError::InvalidStatus(format!(
                "a review must verify or reject, not set {status}"
            )));
        }

        let status_json = to_json(&status, "status")?;
        let processing = to_json(&VerificationStatus::Processing, "status")?;
        let conn = self.conn()?;
        let rows = conn
            .execute(
                "UPDATE documents SET status = ?1, admin_comments = ?2, updated_at = ?3
                 WHERE id = ?4 AND status != ?5",
                params![
                    status_json,
                    comments,
                    Utc::now().to_rfc3339(),
                    id.to_string(),
                    processing
                ],
            )
            .map_err(db_err("record review"))?;

        if rows == 0 {
            return Err(if document_exists(&conn, id)? {
                DocverifyError::InvalidStatus("document is still being analysed".into())
            } else {
                DocverifyError::DocumentNotFound(*id)
            });
        }

        info!("review recorded");
        Ok(())
    }

    /// Delete a document record. Idempotent.
    #[instrument(skip(self), fields(document_id = %id))]
    pub fn delete_document(&self, id: &DocumentId) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])
            .map_err(db_err("delete document"))?;

        info!("document deleted");
        Ok(())
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<DocumentRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(db_err("prepare"))?;
        let records = stmt
            .query_map(params, row_to_record)
            .map_err(db_err("query"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err("row parse"))?;
        Ok(records)
    }
}

impl DocumentStore for SqliteDocumentStore {
    /// Queued and pending documents move to processing; reviewed ones keep
    /// their decision.
    #[instrument(skip(self), fields(document_id = %id))]
    fn mark_processing(&self, id: &DocumentId) -> Result<()> {
        let processing = to_json(&VerificationStatus::Processing, "status")?;
        let pending = to_json(&VerificationStatus::Pending, "status")?;
        let conn = self.conn()?;
        let rows = conn
            .execute(
                "UPDATE documents SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status IN (?1, ?4)",
                params![processing, Utc::now().to_rfc3339(), id.to_string(), pending],
            )
            .map_err(db_err("update status"))?;

        if rows == 0 {
            if !document_exists(&conn, id)? {
                return Err(DocverifyError::DocumentNotFound(*id));
            }
            info!("document already decided; left as is");
            return Ok(());
        }
        debug!("document marked processing");
        Ok(())
    }

    /// Lands only on a document still in processing. A reviewer decision
    /// made meanwhile wins and the result is dropped.
    #[instrument(skip(self, result), fields(document_id = %id, status = %result.status()))]
    fn update_document_record(&self, id: &DocumentId, result: &AnalysisResult) -> Result<()> {
        let status_json = to_json(&result.status(), "status")?;
        let data_json = to_json(&result.extracted_data(), "extracted_data")?;
        let processing = to_json(&VerificationStatus::Processing, "status")?;
        let notes = Some(result.notes()).filter(|notes| !notes.is_empty());

        let conn = self.conn()?;
        let rows = conn
            .execute(
                "UPDATE documents SET status = ?1, confidence = ?2, extracted_data = ?3,
                 admin_comments = ?4, updated_at = ?5
                 WHERE id = ?6 AND status = ?7",
                params![
                    status_json,
                    result.confidence(),
                    data_json,
                    notes,
                    Utc::now().to_rfc3339(),
                    id.to_string(),
                    processing,
                ],
            )
            .map_err(db_err("update document record"))?;

        if rows == 0 {
            if !document_exists(&conn, id)? {
                return Err(DocverifyError::DocumentNotFound(*id));
            }
            warn!("analysis result superseded by review");
            return Ok(());
        }

        info!(confidence = result.confidence(), "document record updated");
        Ok(())
    }
}

fn document_exists(conn: &Connection, id: &DocumentId) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM documents WHERE id = ?1)",
        params![id.to_string()],
        |row| row.get(0),
    )
    .map_err(db_err("lookup document"))
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

/// Column indices follow `SELECT_COLUMNS`.
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRecord> {
    let id_str: String = row.get(0)?;
    let kind_json: String = row.get(2)?;
    let file_path: String = row.get(3)?;
    let status_json: String = row.get(6)?;
    let data_json: Option<String> = row.get(8)?;
    let created_at_str: String = row.get(10)?;
    let updated_at_str: String = row.get(11)?;

    let uuid = uuid::Uuid::parse_str(&id_str).map_err(|e| conversion_err(0, e))?;
    let kind: DocumentKind = serde_json::from_str(&kind_json).map_err(|e| conversion_err(2, e))?;
    let status: VerificationStatus =
        serde_json::from_str(&status_json).map_err(|e| conversion_err(6, e))?;
    let extracted_data: Option<BTreeMap<String, String>> = data_json
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| conversion_err(8, e))?;

    Ok(DocumentRecord {
        id: DocumentId(uuid),
        owner: row.get(1)?,
        kind,
        file_path: file_path.into(),
        original_name: row.get(4)?,
        mime_type: row.get(5)?,
        status,
        confidence: row.get(7)?,
        extracted_data,
        admin_comments: row.get(9)?,
        created_at: parse_time(10, &created_at_str)?,
        updated_at: parse_time(11, &updated_at_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use docverify_core::types::{
        ClassificationResult, DocumentCategory, ExtractedFields, Field,
    };

    fn test_record(owner: &str) -> DocumentRecord {
        DocumentRecord::new(
            owner,
            DocumentKind::IdProof,
            "/uploads/pan.jpg",
            "pan.jpg",
            Some("image/jpeg".into()),
        )
    }

    fn verified_result() -> AnalysisResult {
        let mut fields = ExtractedFields::new();
        fields.fill(Field::IdNumber, "ABCDE1234F");
        AnalysisResult::completed(
            ClassificationResult::new(DocumentCategory::TaxId, 0.90),
            fields,
            0.99,
            VerificationStatus::Verified,
            "INCOME TAX DEPARTMENT\nABCDE1234F".into(),
            "Processed with image enhancement. Type: PAN Card".into(),
        )
    }

    #[test]
    fn insert_and_retrieve_document() {
        let store = SqliteDocumentStore::open_in_memory().expect("open in-memory db");
        let record = test_record("user-1");
        store.insert_document(&record).expect("insert");

        let fetched = store.get_document(&record.id).expect("get").expect("found");
        assert_eq!(fetched.id, record.id);
        assert_eq!(fetched.owner, "user-1");
        assert_eq!(fetched.kind, DocumentKind::IdProof);
        assert_eq!(fetched.status, VerificationStatus::Processing);
        assert_eq!(fetched.mime_type.as_deref(), Some("image/jpeg"));
        assert!(fetched.extracted_data.is_none());
    }

    #[test]
    fn terminal_update_persists_analysis() {
        let store = SqliteDocumentStore::open_in_memory().expect("open in-memory db");
        let record = test_record("user-1");
        store.insert_document(&record).expect("insert");

        store
            .update_document_record(&record.id, &verified_result())
            .expect("update");

        let fetched = store.get_document(&record.id).expect("get").expect("found");
        assert_eq!(fetched.status, VerificationStatus::Verified);
        assert_eq!(fetched.confidence, 0.99);
        let data = fetched.extracted_data.expect("extracted data");
        assert_eq!(data["document_type"], "PAN Card");
        assert_eq!(data["id_number"], "ABCDE1234F");
        assert_eq!(data["name_guess"], "Not Found");
        assert_eq!(data["ai_confidence"], "99%");
        assert!(
            fetched
                .admin_comments
                .as_deref()
                .is_some_and(|c| c.contains("Type: PAN Card"))
        );
        assert!(fetched.updated_at >= fetched.created_at);
    }

    #[test]
    fn failed_result_keeps_default_confidence() {
        let store = SqliteDocumentStore::open_in_memory().expect("open in-memory db");
        let record = test_record("user-1");
        store.insert_document(&record).expect("insert");

        store
            .update_document_record(&record.id, &AnalysisResult::failed("tesseract missing"))
            .expect("update");

        let fetched = store.get_document(&record.id).expect("get").expect("found");
        assert_eq!(fetched.status, VerificationStatus::Pending);
        assert_eq!(fetched.confidence, 0.0);
        assert_eq!(
            fetched.admin_comments.as_deref(),
            Some("AI processing failed: tesseract missing")
        );
    }

    #[test]
    fn updating_missing_document_is_not_found() {
        let store = SqliteDocumentStore::open_in_memory().expect("open in-memory db");
        let id = DocumentId::new();
        assert!(matches!(
            store.update_document_record(&id, &verified_result()),
            Err(DocverifyError::DocumentNotFound(missing)) if missing == id
        ));
        assert!(matches!(
            store.mark_processing(&id),
            Err(DocverifyError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn review_queue_holds_pending_and_rejected() {
        let store = SqliteDocumentStore::open_in_memory().expect("open in-memory db");
        let verified = test_record("a");
        let pending = test_record("b");
        let rejected = test_record("c");
        let processing = test_record("d");
        for record in [&verified, &pending, &rejected, &processing] {
            store.insert_document(record).expect("insert");
        }

        store
            .update_document_record(&verified.id, &verified_result())
            .expect("verify");
        store
            .update_document_record(&pending.id, &AnalysisResult::failed("blurry"))
            .expect("pend");
        store
            .update_document_record(&rejected.id, &verified_result())
            .expect("verify");
        store
            .record_review(&rejected.id, VerificationStatus::Rejected, Some("expired"))
            .expect("reject");

        let queue = store.review_queue().expect("queue");
        let ids: Vec<_> = queue.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&pending.id));
        assert!(ids.contains(&rejected.id));
        assert!(queue[0].created_at >= queue[1].created_at);
    }

    #[test]
    fn review_sets_status_and_comment() {
        let store = SqliteDocumentStore::open_in_memory().expect("open in-memory db");
        let record = test_record("user-1");
        store.insert_document(&record).expect("insert");
        store
            .update_document_record(&record.id, &AnalysisResult::failed("blurry"))
            .expect("pend");

        store
            .record_review(&record.id, VerificationStatus::Verified, Some("checked by hand"))
            .expect("review");

        let fetched = store.get_document(&record.id).expect("get").expect("found");
        assert_eq!(fetched.status, VerificationStatus::Verified);
        assert_eq!(fetched.admin_comments.as_deref(), Some("checked by hand"));
    }

    #[test]
    fn review_rejects_non_terminal_status() {
        let store = SqliteDocumentStore::open_in_memory().expect("open in-memory db");
        let record = test_record("user-1");
        store.insert_document(&record).expect("insert");

        for status in [VerificationStatus::Pending, VerificationStatus::Processing] {
            assert!(matches!(
                store.record_review(&record.id, status, None),
                Err(DocverifyError::InvalidStatus(_))
            ));
        }
    }

    #[test]
    fn review_waits_for_analysis() {
        let store = SqliteDocumentStore::open_in_memory().expect("open in-memory db");
        let record = test_record("user-1");
        store.insert_document(&record).expect("insert");

        assert!(matches!(
            store.record_review(&record.id, VerificationStatus::Rejected, Some("forged")),
            Err(DocverifyError::InvalidStatus(_))
        ));
        assert!(matches!(
            store.record_review(&DocumentId::new(), VerificationStatus::Rejected, None),
            Err(DocverifyError::DocumentNotFound(_))
        ));
        let fetched = store.get_document(&record.id).expect("get").expect("found");
        assert_eq!(fetched.status, VerificationStatus::Processing);
    }

    #[test]
    fn reviewed_document_survives_late_analysis() {
        let store = SqliteDocumentStore::open_in_memory().expect("open in-memory db");
        let record = test_record("user-1");
        store.insert_document(&record).expect("insert");
        store
            .update_document_record(&record.id, &AnalysisResult::failed("blurry"))
            .expect("pend");
        store
            .record_review(&record.id, VerificationStatus::Rejected, Some("forged"))
            .expect("reject");

        store.mark_processing(&record.id).expect("mark");
        store
            .update_document_record(&record.id, &verified_result())
            .expect("late update is dropped, not an error");

        let fetched = store.get_document(&record.id).expect("get").expect("found");
        assert_eq!(fetched.status, VerificationStatus::Rejected);
        assert_eq!(fetched.admin_comments.as_deref(), Some("forged"));
        assert_eq!(fetched.confidence, 0.0);
    }

    #[test]
    fn pending_document_can_be_reanalysed() {
        let store = SqliteDocumentStore::open_in_memory().expect("open in-memory db");
        let record = test_record("user-1");
        store.insert_document(&record).expect("insert");
        store
            .update_document_record(&record.id, &AnalysisResult::failed("blurry"))
            .expect("pend");

        store.mark_processing(&record.id).expect("mark");
        store
            .update_document_record(&record.id, &verified_result())
            .expect("update");

        let fetched = store.get_document(&record.id).expect("get").expect("found");
        assert_eq!(fetched.status, VerificationStatus::Verified);
    }

    #[test]
    fn documents_filtered_by_owner() {
        let store = SqliteDocumentStore::open_in_memory().expect("open in-memory db");
        store.insert_document(&test_record("alice")).expect("insert");
        store.insert_document(&test_record("alice")).expect("insert");
        store.insert_document(&test_record("bob")).expect("insert");

        assert_eq!(store.documents_for_owner("alice").expect("alice").len(), 2);
        assert_eq!(store.documents_for_owner("bob").expect("bob").len(), 1);
        assert!(store.documents_for_owner("carol").expect("carol").is_empty());
        assert_eq!(store.all_documents().expect("all").len(), 3);
    }

    #[test]
    fn delete_document_is_idempotent() {
        let store = SqliteDocumentStore::open_in_memory().expect("open in-memory db");
        let record = test_record("user-1");
        store.insert_document(&record).expect("insert");

        store.delete_document(&record.id).expect("delete first time");
        store
            .delete_document(&record.id)
            .expect("delete second time (idempotent)");
        assert!(store.get_document(&record.id).expect("get").is_none());
    }

    #[test]
    fn reopening_file_database_keeps_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("documents.db");
        let record = test_record("user-1");
        {
            let store = SqliteDocumentStore::open(&path).expect("open");
            store.insert_document(&record).expect("insert");
        }
        let store = SqliteDocumentStore::open(&path).expect("reopen");
        assert!(store.get_document(&record.id).expect("get").is_some());
    }
}
