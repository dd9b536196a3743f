use std::sync::Mutex;

use chrono::{Duration, Utc};
use rusqlite::Connection;
use tracing::warn;

/// Sliding-window token-bucket rate limiter, SQLite-backed so the limit is
/// shared across every worker/gateway instance rather than per-process
/// in-memory state (spec §4.1, §6 — rate limiting must be an out-of-process,
/// shared resource).
pub struct RateLimiter {
    db: Mutex<Connection>,
    capacity: u32,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(conn: Connection, capacity: u32, window_secs: u64) -> Self {
        Self {
            db: Mutex::new(conn),
            capacity,
            window_secs,
        }
    }

    /// Check whether `user_id` may act now, recording the attempt if allowed.
    ///
    /// Fails open: a storage error logs a warning and allows the request
    /// rather than locking a user out because of an infrastructure hiccup.
    pub fn check_and_record(&self, user_id: &str) -> bool {
        match self.try_check_and_record(user_id) {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(user_id, error = %e, "rate limiter storage error, failing open");
                true
            }
        }
    }

    fn try_check_and_record(&self, user_id: &str) -> rusqlite::Result<bool> {
        let now = Utc::now();
        let window_start = (now - Duration::seconds(self.window_secs as i64)).to_rfc3339();

        let db = self.db.lock().unwrap();

        // Opportunistic cleanup: drop events fallen out of every window, not
        // just this user's, bounding table growth without a separate sweep task.
        let retain_from = (now - Duration::seconds(self.window_secs as i64 * 2)).to_rfc3339();
        db.execute(
            "DELETE FROM rate_limit_events WHERE ts < ?1",
            rusqlite::params![retain_from],
        )?;

        let count: u32 = db.query_row(
            "SELECT COUNT(*) FROM rate_limit_events WHERE user_id = ?1 AND ts >= ?2",
            rusqlite::params![user_id, window_start],
            |row| row.get(0),
        )?;

        if count >= self.capacity {
            return Ok(false);
        }

        db.execute(
            "INSERT INTO rate_limit_events (user_id, ts) VALUES (?1, ?2)",
            rusqlite::params![user_id, now.to_rfc3339()],
        )?;

        Ok(true)
    }

    /// Seconds until the oldest surviving event for `user_id` falls out of
    /// the window — the "wait N seconds" the rate-limit middleware reports
    /// on rejection (spec §4.1).
    pub fn retry_after_secs(&self, user_id: &str) -> Option<u64> {
        let now = Utc::now();
        let window_start = (now - Duration::seconds(self.window_secs as i64)).to_rfc3339();

        let db = self.db.lock().unwrap();
        let oldest: Option<String> = db
            .query_row(
                "SELECT MIN(ts) FROM rate_limit_events WHERE user_id = ?1 AND ts >= ?2",
                rusqlite::params![user_id, window_start],
                |row| row.get(0),
            )
            .unwrap_or(None);

        let oldest_ts = chrono::DateTime::parse_from_rfc3339(&oldest?)
            .ok()?
            .with_timezone(&Utc);
        let expires_at = oldest_ts + Duration::seconds(self.window_secs as i64);
        Some((expires_at - Utc::now()).num_seconds().max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(capacity: u32, window_secs: u64) -> RateLimiter {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        RateLimiter::new(conn, capacity, window_secs)
    }

    #[test]
    fn allows_up_to_capacity_then_denies() {
        let rl = limiter(3, 60);
        assert!(rl.check_and_record("u1"));
        assert!(rl.check_and_record("u1"));
        assert!(rl.check_and_record("u1"));
        assert!(!rl.check_and_record("u1"));
    }

    #[test]
    fn separate_users_have_independent_buckets() {
        let rl = limiter(1, 60);
        assert!(rl.check_and_record("u1"));
        assert!(rl.check_and_record("u2"));
        assert!(!rl.check_and_record("u1"));
    }

    #[test]
    fn retry_after_is_none_with_no_history() {
        let rl = limiter(3, 60);
        assert_eq!(rl.retry_after_secs("u1"), None);
    }

    #[test]
    fn retry_after_is_bounded_by_window() {
        let rl = limiter(1, 60);
        rl.check_and_record("u1");
        let wait = rl.retry_after_secs("u1").unwrap();
        assert!(wait <= 60);
    }
}
