//! Audit trail of vault-level operations, kept in SQLite.
//!
//! One row per operation (create, open, rename, backup, passwd, import,
//! ...) in `<vaults_dir>/audit.db`.  Rows carry the vault name and a short
//! detail string and never hold secrets.
//!
//! Logging is best-effort: when the database is unavailable the calling
//! command carries on unrecorded.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use crate::errors::{LockboxError, Result};

/// File name of the audit database inside the vaults directory.
pub const DB_FILE: &str = "audit.db";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS vault_events (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    at         TEXT NOT NULL,
    operation  TEXT NOT NULL,
    vault      TEXT NOT NULL,
    details    TEXT
);
CREATE INDEX IF NOT EXISTS vault_events_at ON vault_events (at);";

/// One recorded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub vault: String,
    pub details: Option<String>,
}

pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open or create `<vaults_dir>/audit.db`.
    ///
    /// `None` means auditing is unavailable; callers go on without it.
    pub fn open(vaults_dir: &Path) -> Option<Self> {
        let db_path = Self::db_path(vaults_dir);
        let conn = Connection::open(&db_path)
            .and_then(|conn| conn.execute_batch(SCHEMA).map(|()| conn))
            .map_err(|e| {
                tracing::debug!(path = %db_path.display(), error = %e, "audit log unavailable");
            })
            .ok()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) =
                std::fs::set_permissions(&db_path, std::fs::Permissions::from_mode(0o600))
            {
                tracing::debug!(error = %e, "could not restrict audit db permissions");
            }
        }

        Some(Self { conn })
    }

    /// Append one row.  A failed insert is logged and otherwise ignored.
    pub fn log(&self, operation: &str, vault: &str, details: Option<&str>) {
        let inserted = self.conn.execute(
            "INSERT INTO vault_events (at, operation, vault, details) VALUES (?1, ?2, ?3, ?4)",
            params![timestamp(Utc::now()), operation, vault, details],
        );
        if let Err(e) = inserted {
            tracing::debug!(error = %e, operation, vault, "audit write failed");
        }
    }

    /// Up to `limit` rows at or after `since`, newest first.
    pub fn query(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<AuditEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let since = timestamp(since.unwrap_or(DateTime::<Utc>::UNIX_EPOCH));

        let mut stmt = self
            .conn
            .prepare(
                "SELECT seq, at, operation, vault, details FROM vault_events
                 WHERE at >= ?1 ORDER BY seq DESC LIMIT ?2",
            )
            .map_err(|e| LockboxError::AuditError(format!("prepare: {e}")))?;

        let rows = stmt
            .query_map(params![since, limit], read_row)
            .map_err(|e| LockboxError::AuditError(format!("query: {e}")))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| LockboxError::AuditError(format!("read row: {e}")))
    }

    pub fn db_path(vaults_dir: &Path) -> PathBuf {
        vaults_dir.join(DB_FILE)
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    let at: String = row.get(1)?;
    let timestamp = DateTime::parse_from_rfc3339(&at)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(AuditEntry {
        id: row.get(0)?,
        timestamp,
        operation: row.get(2)?,
        vault: row.get(3)?,
        details: row.get(4)?,
    })
}

/// Fixed-width RFC 3339 so stored timestamps compare as text.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Record an operation in the audit database under `vaults_dir`.
pub fn log_audit(vaults_dir: &Path, operation: &str, vault: &str, details: Option<&str>) {
    if let Some(audit) = AuditLog::open(vaults_dir) {
        audit.log(operation, vault, details);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rows_come_back_newest_first() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::open(dir.path()).unwrap();
        assert!(dir.path().join(DB_FILE).exists());

        audit.log("create", "Personal", None);
        audit.log("open", "Personal", None);
        audit.log("rename", "Home", Some("from 'Personal'"));

        let ops: Vec<_> = audit
            .query(10, None)
            .unwrap()
            .into_iter()
            .map(|e| (e.operation, e.vault, e.details))
            .collect();
        let expected: Vec<(String, String, Option<String>)> = vec![
            ("rename".into(), "Home".into(), Some("from 'Personal'".into())),
            ("open".into(), "Personal".into(), None),
            ("create".into(), "Personal".into(), None),
        ];
        assert_eq!(ops, expected);
    }

    #[test]
    fn limit_caps_the_result() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::open(dir.path()).unwrap();
        for n in 0..6 {
            audit.log("backup", &format!("v{n}"), None);
        }
        let rows = audit.query(2, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].vault, "v5");
    }

    #[test]
    fn since_excludes_older_rows() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::open(dir.path()).unwrap();
        audit.log("passwd", "Work", Some("3 entries re-encrypted"));

        let an_hour_ago = Utc::now() - chrono::Duration::hours(1);
        let in_an_hour = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(audit.query(10, Some(an_hour_ago)).unwrap().len(), 1);
        assert!(audit.query(10, Some(in_an_hour)).unwrap().is_empty());
    }

    #[test]
    fn rows_persist_across_connections() {
        let dir = TempDir::new().unwrap();
        log_audit(dir.path(), "remove", "Old", None);
        log_audit(dir.path(), "restore", "Old", Some("old.bak"));

        let audit = AuditLog::open(dir.path()).unwrap();
        assert_eq!(audit.query(10, None).unwrap().len(), 2);
    }

    #[test]
    fn missing_directory_disables_auditing() {
        let missing = Path::new("/nonexistent/lockbox/audit/dir");
        assert!(AuditLog::open(missing).is_none());
        log_audit(missing, "open", "x", None);
    }

    #[cfg(unix)]
    #[test]
    fn database_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let _audit = AuditLog::open(dir.path()).unwrap();
        let mode = std::fs::metadata(AuditLog::db_path(dir.path()))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
