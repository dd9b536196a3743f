use rusqlite::Connection;

use crate::error::Result;

/// Initialise the rate-limit, duplicate-hash-index, and blob-bookkeeping
/// tables. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS rate_limit_events (
            id      INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            ts      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_rate_limit_user_ts
            ON rate_limit_events(user_id, ts);

        CREATE TABLE IF NOT EXISTS upload_hashes (
            user_id      TEXT NOT NULL,
            phash        TEXT NOT NULL,
            analysis_id  TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            PRIMARY KEY (user_id, phash)
        );
        CREATE INDEX IF NOT EXISTS idx_upload_hashes_created
            ON upload_hashes(created_at);

        CREATE TABLE IF NOT EXISTS blobs (
            blob_key   TEXT PRIMARY KEY NOT NULL,
            stored_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_blobs_stored_at
            ON blobs(stored_at);",
    )?;
    Ok(())
}
