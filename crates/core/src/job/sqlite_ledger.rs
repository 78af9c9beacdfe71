//! SQLite-backed job ledger implementation.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use rusqlite::{params, Connection};

use super::{Job, JobError, JobLedger, JobStatus, ShareGrant};

const JOB_COLUMNS: &str = "id, source_name, source_format, target_format, status, duration_ms, error, created_at, original_path, original_mime_type, artifact_path, artifact_mime_type, stored_at, share_token, share_token_expires_at";

/// Random bytes behind each share token.
const SHARE_TOKEN_BYTES: usize = 16;

/// Cap for share lifetimes that overflow the calendar.
const MAX_SHARE_TTL_DAYS: i64 = 36_500;

/// SQLite-backed job ledger.
pub struct SqliteJobLedger {
    conn: Mutex<Connection>,
}

impl SqliteJobLedger {
    /// Open or create the ledger database at `path`.
    pub fn new(path: &Path) -> Result<Self, JobError> {
        let conn = Connection::open(path).map_err(|e| JobError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory ledger (useful for testing).
    pub fn in_memory() -> Result<Self, JobError> {
        let conn = Connection::open_in_memory().map_err(|e| JobError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JobError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS conversion_jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_name TEXT NOT NULL,
                source_format TEXT NOT NULL,
                target_format TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                duration_ms INTEGER,
                error TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_conversion_jobs_created_at ON conversion_jobs(created_at);
            "#,
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        // Migrations: storage and sharing columns were added after the first release
        for column in [
            "original_path TEXT",
            "original_mime_type TEXT",
            "artifact_path TEXT",
            "artifact_mime_type TEXT",
            "stored_at TEXT",
            "share_token TEXT",
            "share_token_expires_at TEXT",
        ] {
            let _ = conn.execute(
                &format!("ALTER TABLE conversion_jobs ADD COLUMN {}", column),
                [],
            );
        }

        Ok(())
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let status_str: String = row.get(4)?;
        let duration_ms: Option<i64> = row.get(5)?;
        let created_at_str: String = row.get(7)?;
        let stored_at_str: Option<String> = row.get(12)?;
        let expires_at_str: Option<String> = row.get(14)?;

        Ok(Job {
            id: row.get(0)?,
            source_name: row.get(1)?,
            source_format: row.get(2)?,
            target_format: row.get(3)?,
            status: JobStatus::parse(&status_str).unwrap_or(JobStatus::Pending),
            duration_ms: duration_ms.map(|ms| ms.max(0) as u64),
            error: row.get(6)?,
            created_at: parse_timestamp(&created_at_str).unwrap_or_else(Utc::now),
            original_path: row.get(8)?,
            original_mime_type: row.get(9)?,
            artifact_path: row.get(10)?,
            artifact_mime_type: row.get(11)?,
            stored_at: stored_at_str.as_deref().and_then(parse_timestamp),
            share_token: row.get(13)?,
            share_token_expires_at: expires_at_str.as_deref().and_then(parse_timestamp),
        })
    }

    fn fetch(conn: &Connection, id: i64) -> Result<Job, JobError> {
        let result = conn.query_row(
            &format!("SELECT {} FROM conversion_jobs WHERE id = ?", JOB_COLUMNS),
            params![id],
            Self::row_to_job,
        );

        match result {
            Ok(job) => Ok(job),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(JobError::NotFound(id)),
            Err(e) => Err(JobError::Database(e.to_string())),
        }
    }

    /// Terminal transition shared by `mark_success` and `mark_failed`.
    fn finish(
        &self,
        id: i64,
        status: JobStatus,
        duration_ms: Option<u64>,
        error: Option<&str>,
    ) -> Result<Job, JobError> {
        let conn = self.conn.lock().unwrap();
        let current = Self::fetch(&conn, id)?;

        if current.status.is_terminal() && current.status != status {
            return Err(JobError::InvalidState {
                job_id: id,
                current_state: current.status.as_str().to_string(),
                operation: format!("mark {}", status.as_str()),
            });
        }

        let duration = duration_ms.or(current.duration_ms);
        let error = error.map(str::to_string).or(current.error.clone());

        conn.execute(
            "UPDATE conversion_jobs SET status = ?, duration_ms = ?, error = ? WHERE id = ?",
            params![status.as_str(), duration.map(|ms| ms as i64), error, id],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(Job {
            status,
            duration_ms: duration,
            error,
            ..current
        })
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn generate_share_token() -> String {
    let mut bytes = [0u8; SHARE_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

impl JobLedger for SqliteJobLedger {
    fn create(
        &self,
        source_name: &str,
        source_format: &str,
        target_format: &str,
    ) -> Result<Job, JobError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO conversion_jobs (source_name, source_format, target_format, status, created_at) VALUES (?, ?, ?, ?, ?)",
            params![
                source_name,
                source_format,
                target_format,
                JobStatus::Pending.as_str(),
                format_timestamp(now),
            ],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Self::fetch(&conn, conn.last_insert_rowid())
    }

    fn begin_attempt(&self, id: i64) -> Result<Job, JobError> {
        let conn = self.conn.lock().unwrap();
        let current = Self::fetch(&conn, id)?;

        conn.execute(
            "UPDATE conversion_jobs SET status = ?, error = NULL, duration_ms = NULL WHERE id = ?",
            params![JobStatus::Pending.as_str(), id],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(Job {
            status: JobStatus::Pending,
            error: None,
            duration_ms: None,
            ..current
        })
    }

    fn mark_original_stored(&self, id: i64, path: &str, mime_type: &str) -> Result<Job, JobError> {
        let conn = self.conn.lock().unwrap();
        let current = Self::fetch(&conn, id)?;

        conn.execute(
            "UPDATE conversion_jobs SET original_path = ?, original_mime_type = ? WHERE id = ?",
            params![path, mime_type, id],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(Job {
            original_path: Some(path.to_string()),
            original_mime_type: Some(mime_type.to_string()),
            ..current
        })
    }

    fn mark_artifact_stored(
        &self,
        id: i64,
        path: &str,
        mime_type: &str,
        stored_at: DateTime<Utc>,
    ) -> Result<Job, JobError> {
        let conn = self.conn.lock().unwrap();
        let current = Self::fetch(&conn, id)?;

        conn.execute(
            "UPDATE conversion_jobs SET artifact_path = ?, artifact_mime_type = ?, stored_at = ? WHERE id = ?",
            params![path, mime_type, format_timestamp(stored_at), id],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(Job {
            artifact_path: Some(path.to_string()),
            artifact_mime_type: Some(mime_type.to_string()),
            stored_at: Some(stored_at),
            ..current
        })
    }

    fn mark_failed(&self, id: i64, error: &str) -> Result<Job, JobError> {
        self.finish(id, JobStatus::Failed, None, Some(error))
    }

    fn mark_success(&self, id: i64, duration_ms: u64) -> Result<Job, JobError> {
        self.finish(id, JobStatus::Success, Some(duration_ms), None)
    }

    fn append_error(&self, id: i64, note: &str) -> Result<Job, JobError> {
        let conn = self.conn.lock().unwrap();
        let current = Self::fetch(&conn, id)?;

        let error = match current.error.as_deref() {
            Some(existing) if !existing.is_empty() => format!("{}; {}", existing, note),
            _ => format!("; {}", note),
        };

        conn.execute(
            "UPDATE conversion_jobs SET error = ? WHERE id = ?",
            params![error, id],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(Job {
            error: Some(error),
            ..current
        })
    }

    fn get(&self, id: i64) -> Result<Option<Job>, JobError> {
        let conn = self.conn.lock().unwrap();

        match Self::fetch(&conn, id) {
            Ok(job) => Ok(Some(job)),
            Err(JobError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<Job>, JobError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {} FROM conversion_jobs ORDER BY created_at DESC, id DESC LIMIT ?",
            JOB_COLUMNS
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| JobError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![limit as i64], Self::row_to_job)
            .map_err(|e| JobError::Database(e.to_string()))?;

        let mut jobs = Vec::new();
        for row_result in rows {
            let job = row_result.map_err(|e| JobError::Database(e.to_string()))?;
            jobs.push(job);
        }

        Ok(jobs)
    }

    fn issue_share_token(&self, id: i64, ttl: Duration) -> Result<ShareGrant, JobError> {
        let conn = self.conn.lock().unwrap();
        let current = Self::fetch(&conn, id)?;

        if !current.artifact_stored() {
            return Err(JobError::InvalidState {
                job_id: id,
                current_state: "no stored artifact".to_string(),
                operation: "share".to_string(),
            });
        }

        let now = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or_else(|| now + chrono::Duration::days(MAX_SHARE_TTL_DAYS));
        let token = generate_share_token();

        conn.execute(
            "UPDATE conversion_jobs SET share_token = ?, share_token_expires_at = ? WHERE id = ?",
            params![token, format_timestamp(expires_at), id],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(ShareGrant {
            job_id: id,
            token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::authorize_artifact_access;

    fn create_test_ledger() -> SqliteJobLedger {
        SqliteJobLedger::in_memory().unwrap()
    }

    fn stored_job(ledger: &SqliteJobLedger) -> Job {
        let job = ledger.create("report.docx", "docx", "pdf").unwrap();
        ledger.mark_success(job.id, 12).unwrap();
        ledger
            .mark_artifact_stored(job.id, "/tmp/1_abc_report.pdf", "application/pdf", Utc::now())
            .unwrap()
    }

    #[test]
    fn test_create_job() {
        let ledger = create_test_ledger();
        let job = ledger.create("report.docx", "docx", "pdf").unwrap();

        assert!(job.id > 0);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.source_name, "report.docx");
        assert!(job.duration_ms.is_none());
        assert!(job.error.is_none());
        assert!(!job.artifact_stored());
        assert!(!job.original_stored());
    }

    #[test]
    fn test_ids_are_monotonic() {
        let ledger = create_test_ledger();
        let first = ledger.create("a.txt", "txt", "pdf").unwrap();
        let second = ledger.create("b.txt", "txt", "pdf").unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn test_get_nonexistent_job() {
        let ledger = create_test_ledger();
        assert!(ledger.get(999).unwrap().is_none());
        assert!(matches!(ledger.require(999), Err(JobError::NotFound(999))));
    }

    #[test]
    fn test_mark_success_persists() {
        let ledger = create_test_ledger();
        let job = ledger.create("report.docx", "docx", "pdf").unwrap();
        ledger.mark_success(job.id, 42).unwrap();

        let fetched = ledger.get(job.id).unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Success);
        assert_eq!(fetched.duration_ms, Some(42));
    }

    #[test]
    fn test_failed_job_cannot_succeed() {
        let ledger = create_test_ledger();
        let job = ledger.create("report.docx", "docx", "pdf").unwrap();
        ledger.mark_failed(job.id, "boom").unwrap();

        let result = ledger.mark_success(job.id, 1);
        assert!(matches!(result, Err(JobError::InvalidState { .. })));

        let fetched = ledger.get(job.id).unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Failed);
        assert_eq!(fetched.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_successful_job_cannot_fail() {
        let ledger = create_test_ledger();
        let job = ledger.create("report.docx", "docx", "pdf").unwrap();
        ledger.mark_success(job.id, 3).unwrap();

        assert!(matches!(
            ledger.mark_failed(job.id, "late failure"),
            Err(JobError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_begin_attempt_resets_to_pending() {
        let ledger = create_test_ledger();
        let job = ledger.create("report.docx", "docx", "pdf").unwrap();
        ledger.mark_failed(job.id, "boom").unwrap();

        let retried = ledger.begin_attempt(job.id).unwrap();
        assert_eq!(retried.status, JobStatus::Pending);
        assert!(retried.error.is_none());

        let done = ledger.mark_success(job.id, 8).unwrap();
        assert_eq!(done.status, JobStatus::Success);
    }

    #[test]
    fn test_append_error_keeps_status() {
        let ledger = create_test_ledger();
        let job = ledger.create("report.docx", "docx", "pdf").unwrap();
        ledger.mark_success(job.id, 5).unwrap();

        let updated = ledger
            .append_error(job.id, "artifact save failed: disk full")
            .unwrap();
        assert_eq!(updated.status, JobStatus::Success);
        assert_eq!(
            updated.error.as_deref(),
            Some("; artifact save failed: disk full")
        );

        ledger.mark_failed(job.id, "x").unwrap_err();
        let second = ledger.append_error(job.id, "another").unwrap();
        assert_eq!(
            second.error.as_deref(),
            Some("; artifact save failed: disk full; another")
        );
    }

    #[test]
    fn test_mark_artifact_stored_sets_pair() {
        let ledger = create_test_ledger();
        let job = stored_job(&ledger);

        let fetched = ledger.get(job.id).unwrap().unwrap();
        assert!(fetched.artifact_stored());
        assert_eq!(fetched.artifact_path.as_deref(), Some("/tmp/1_abc_report.pdf"));
        assert_eq!(fetched.artifact_mime_type.as_deref(), Some("application/pdf"));
        assert!(fetched.stored_at.is_some());
    }

    #[test]
    fn test_mark_original_stored() {
        let ledger = create_test_ledger();
        let job = ledger.create("deck.pptx", "pptx", "pdf").unwrap();
        ledger
            .mark_original_stored(job.id, "s3://bucket/originals/1/x/deck.pptx", "application/octet-stream")
            .unwrap();

        let fetched = ledger.get(job.id).unwrap().unwrap();
        assert!(fetched.original_stored());
        assert_eq!(
            fetched.original_path.as_deref(),
            Some("s3://bucket/originals/1/x/deck.pptx")
        );
    }

    #[test]
    fn test_list_recent_ordering_and_limit() {
        let ledger = create_test_ledger();
        let ids: Vec<i64> = (0..5)
            .map(|i| ledger.create(&format!("f{}.txt", i), "txt", "pdf").unwrap().id)
            .collect();

        let recent = ledger.list_recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].id, ids[4]);
        assert_eq!(recent[1].id, ids[3]);
        assert_eq!(recent[2].id, ids[2]);
    }

    #[test]
    fn test_share_requires_artifact() {
        let ledger = create_test_ledger();
        let job = ledger.create("report.docx", "docx", "pdf").unwrap();

        let result = ledger.issue_share_token(job.id, Duration::from_secs(60));
        assert!(matches!(result, Err(JobError::InvalidState { .. })));
    }

    #[test]
    fn test_share_token_validates() {
        let ledger = create_test_ledger();
        let job = stored_job(&ledger);

        let grant = ledger
            .issue_share_token(job.id, Duration::from_secs(60))
            .unwrap();
        assert!(grant.token.len() >= 20);
        assert!(ledger
            .validate_share_token(job.id, &grant.token, Utc::now())
            .unwrap());
        assert!(!ledger
            .validate_share_token(job.id, "wrong", Utc::now())
            .unwrap());
    }

    #[test]
    fn test_zero_ttl_token_is_expired() {
        let ledger = create_test_ledger();
        let job = stored_job(&ledger);

        let grant = ledger.issue_share_token(job.id, Duration::ZERO).unwrap();
        assert!(!ledger
            .validate_share_token(job.id, &grant.token, Utc::now())
            .unwrap());
    }

    #[test]
    fn test_token_expires_after_ttl() {
        let ledger = create_test_ledger();
        let job = stored_job(&ledger);

        let grant = ledger
            .issue_share_token(job.id, Duration::from_secs(1))
            .unwrap();
        let fetched = ledger.require(job.id).unwrap();
        assert!(authorize_artifact_access(&fetched, Some(&grant.token), Utc::now()).is_ok());

        let later = Utc::now() + chrono::Duration::seconds(2);
        let result = authorize_artifact_access(&fetched, Some(&grant.token), later);
        assert!(matches!(result, Err(JobError::AuthFailure(_))));
    }

    #[test]
    fn test_reissue_replaces_token() {
        let ledger = create_test_ledger();
        let job = stored_job(&ledger);

        let first = ledger
            .issue_share_token(job.id, Duration::from_secs(60))
            .unwrap();
        let second = ledger
            .issue_share_token(job.id, Duration::from_secs(60))
            .unwrap();
        assert_ne!(first.token, second.token);
        assert!(!ledger
            .validate_share_token(job.id, &first.token, Utc::now())
            .unwrap());
    }

    #[test]
    fn test_unshared_artifact_is_open() {
        let ledger = create_test_ledger();
        let job = stored_job(&ledger);
        assert!(authorize_artifact_access(&job, None, Utc::now()).is_ok());

        ledger
            .issue_share_token(job.id, Duration::from_secs(60))
            .unwrap();
        let shared = ledger.require(job.id).unwrap();
        assert!(matches!(
            authorize_artifact_access(&shared, None, Utc::now()),
            Err(JobError::AuthFailure(_))
        ));
    }

    #[test]
    fn test_file_based_ledger() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("jobs.db");

        let job_id = {
            let ledger = SqliteJobLedger::new(&db_path).unwrap();
            ledger.create("a.png", "png", "jpg").unwrap().id
        };

        assert!(db_path.exists());

        // Reopening runs the migrations again against the existing table
        let reopened = SqliteJobLedger::new(&db_path).unwrap();
        let fetched = reopened.get(job_id).unwrap();
        assert!(fetched.is_some());
    }
}
