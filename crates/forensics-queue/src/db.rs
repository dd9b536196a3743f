use rusqlite::Connection;

use crate::error::Result;

/// Initialise the job queue schema in `conn`.
///
/// Creates the `jobs` table (idempotent) and indexes the strict-priority
/// dequeue query relies on (spec §4.3: `status`, `priority`, `available_at`).
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS jobs (
            id                 TEXT    NOT NULL PRIMARY KEY,
            user_id            TEXT    NOT NULL,
            chat_id            TEXT    NOT NULL,
            source_message_id  INTEGER NOT NULL,
            progress_msg_id    INTEGER,
            blob_key           TEXT    NOT NULL,
            image_phash        INTEGER NOT NULL DEFAULT 0,
            tier               TEXT    NOT NULL,
            scenario           TEXT    NOT NULL,
            preserve_exif      INTEGER NOT NULL DEFAULT 0,
            priority           TEXT    NOT NULL,
            status             TEXT    NOT NULL DEFAULT 'pending',
            attempts           INTEGER NOT NULL DEFAULT 0,
            available_at       TEXT    NOT NULL,
            result             TEXT,
            error_reason       TEXT,
            created_at         TEXT    NOT NULL,
            updated_at         TEXT    NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_jobs_dequeue
            ON jobs (status, priority, available_at);
        CREATE INDEX IF NOT EXISTS idx_jobs_updated
            ON jobs (status, updated_at);
        ",
    )?;
    Ok(())
}
