use std::sync::Mutex;

use chrono::{Duration, Utc};
use rusqlite::Connection;

use crate::error::Result;

/// Duplicate-upload index: maps `(user_id, phash)` to the `analysis_id` that
/// already analyzed that image, within a rolling window (spec §4.1, §9 — the
/// *original* analysis is retained and reused, the window never refreshes on
/// a repeat upload).
pub struct DuplicateIndex {
    db: Mutex<Connection>,
    window_hours: i64,
}

impl DuplicateIndex {
    pub fn new(conn: Connection, window_hours: i64) -> Self {
        Self {
            db: Mutex::new(conn),
            window_hours,
        }
    }

    /// Return the existing `analysis_id` for `(user_id, phash)` if it was
    /// uploaded within the rolling window, else `None`.
    pub fn check(&self, user_id: &str, phash: u64) -> Result<Option<String>> {
        let cutoff = (Utc::now() - Duration::hours(self.window_hours)).to_rfc3339();
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT analysis_id FROM upload_hashes
             WHERE user_id = ?1 AND phash = ?2 AND created_at >= ?3",
            rusqlite::params![user_id, format!("{phash:016x}"), cutoff],
            |row| row.get::<_, String>(0),
        ) {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Record a freshly-analyzed image hash. Uses `INSERT OR IGNORE` —
    /// the original entry's `created_at` is never overwritten, so the
    /// window is anchored to the first analysis, not the latest repeat.
    pub fn record(&self, user_id: &str, phash: u64, analysis_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR IGNORE INTO upload_hashes (user_id, phash, analysis_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![user_id, format!("{phash:016x}"), analysis_id, now],
        )?;
        Ok(())
    }

    /// Drop hash entries older than the rolling window.
    pub fn sweep_expired(&self) -> Result<usize> {
        let cutoff = (Utc::now() - Duration::hours(self.window_hours)).to_rfc3339();
        let db = self.db.lock().unwrap();
        Ok(db.execute(
            "DELETE FROM upload_hashes WHERE created_at < ?1",
            rusqlite::params![cutoff],
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> DuplicateIndex {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        DuplicateIndex::new(conn, 24)
    }

    #[test]
    fn first_upload_is_not_a_duplicate() {
        let idx = index();
        assert_eq!(idx.check("u1", 0xdead_beef).unwrap(), None);
    }

    #[test]
    fn repeat_upload_resolves_to_original_analysis() {
        let idx = index();
        idx.record("u1", 0xdead_beef, "analysis-1").unwrap();
        assert_eq!(
            idx.check("u1", 0xdead_beef).unwrap(),
            Some("analysis-1".to_string())
        );

        // A second record() call for the same (user, phash) must not replace
        // the original analysis_id (first-write-wins per spec §9).
        idx.record("u1", 0xdead_beef, "analysis-2").unwrap();
        assert_eq!(
            idx.check("u1", 0xdead_beef).unwrap(),
            Some("analysis-1".to_string())
        );
    }

    #[test]
    fn scoped_per_user_not_shared_globally() {
        let idx = index();
        idx.record("u1", 0xdead_beef, "analysis-1").unwrap();
        assert_eq!(idx.check("u2", 0xdead_beef).unwrap(), None);
    }
}
