// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail: append-only SQLite log of every verification decision, made
// either by the analysis pipeline or by a human reviewer.
//
// Schema:
//   audit_log(
//     id           INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp    TEXT    NOT NULL,   -- RFC 3339
//     action       TEXT    NOT NULL,   -- "analysis_completed", "analysis_failed", "review"
//     document_id  TEXT    NOT NULL,
//     fingerprint  TEXT    NOT NULL,   -- SHA-256 hex digest of the image
//     success      INTEGER NOT NULL,   -- 0 = failure, 1 = success
//     details      TEXT                -- optional free-form context
//   )

use std::path::Path;

use chrono::Utc;
use docverify_core::error::DocverifyError;
use docverify_core::types::DocumentId;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub const ACTION_ANALYSIS_COMPLETED: &str = "analysis_completed";
pub const ACTION_ANALYSIS_FAILED: &str = "analysis_failed";
pub const ACTION_REVIEW: &str = "review";

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS audit_log (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp    TEXT    NOT NULL,
        action       TEXT    NOT NULL,
        document_id  TEXT    NOT NULL,
        fingerprint  TEXT    NOT NULL,
        success      INTEGER NOT NULL,
        details      TEXT
    );";

fn db_err(e: rusqlite::Error) -> DocverifyError {
    DocverifyError::Database(e.to_string())
}

/// A single entry in the audit log, used for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub document_id: String,
    pub fingerprint: String,
    pub success: bool,
    pub details: Option<String>,
}

/// Append-only audit log backed by a SQLite database.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `path`, in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocverifyError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("audit log opened");
        Ok(Self { conn })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self, DocverifyError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory audit log opened");
        Ok(Self { conn })
    }

    /// Record a new audit entry.
    #[instrument(skip(self, details), fields(%action, %document_id, success))]
    pub fn record(
        &self,
        action: &str,
        document_id: &DocumentId,
        fingerprint: &str,
        success: bool,
        details: Option<&str>,
    ) -> Result<(), DocverifyError> {
        let timestamp = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO audit_log (timestamp, action, document_id, fingerprint, success, details)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    timestamp,
                    action,
                    document_id.to_string(),
                    fingerprint,
                    i32::from(success),
                    details
                ],
            )
            .map_err(db_err)?;

        debug!("audit entry recorded");
        Ok(())
    }

    /// All entries for one document, oldest first.
    pub fn entries_for_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<AuditEntry>, DocverifyError> {
        self.query(
            "SELECT id, timestamp, action, document_id, fingerprint, success, details
             FROM audit_log WHERE document_id = ?1 ORDER BY id ASC",
            params![document_id.to_string()],
        )
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<AuditEntry>, DocverifyError> {
        self.query(
            "SELECT id, timestamp, action, document_id, fingerprint, success, details
             FROM audit_log ORDER BY id DESC LIMIT ?1",
            params![limit],
        )
    }

    /// Total number of entries in the audit log.
    pub fn count(&self) -> Result<u64, DocverifyError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .map_err(db_err)
    }

    fn query(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<AuditEntry>, DocverifyError> {
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    action: row.get(2)?,
                    document_id: row.get(3)?,
                    fingerprint: row.get(4)?,
                    success: row.get::<_, i32>(5)? != 0,
                    details: row.get(6)?,
                })
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_log() -> AuditLog {
        AuditLog::open_in_memory().expect("open in-memory audit log")
    }

    #[test]
    fn record_and_count() {
        let log = make_log();
        let doc = DocumentId::new();
        assert_eq!(log.count().unwrap(), 0);

        log.record(ACTION_ANALYSIS_COMPLETED, &doc, "abc123", true, None)
            .unwrap();
        log.record(ACTION_REVIEW, &doc, "abc123", true, Some("verified"))
            .unwrap();

        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn entries_for_document() {
        let log = make_log();
        let first = DocumentId::new();
        let second = DocumentId::new();
        log.record(ACTION_ANALYSIS_COMPLETED, &first, "aaa", true, None)
            .unwrap();
        log.record(ACTION_ANALYSIS_FAILED, &second, "bbb", false, Some("ocr crashed"))
            .unwrap();
        log.record(ACTION_REVIEW, &first, "aaa", true, Some("rejected"))
            .unwrap();

        let entries = log.entries_for_document(&first).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, ACTION_ANALYSIS_COMPLETED);
        assert_eq!(entries[1].action, ACTION_REVIEW);

        let entries = log.entries_for_document(&second).unwrap();
        assert!(!entries[0].success);
        assert_eq!(entries[0].details.as_deref(), Some("ocr crashed"));
    }
}
