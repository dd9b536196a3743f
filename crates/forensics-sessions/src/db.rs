use rusqlite::Connection;

use crate::error::Result;

/// Initialise the conversation_state table and its index.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversation_state (
            chat_id     TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            state       TEXT NOT NULL,
            payload     TEXT NOT NULL DEFAULT '{}',
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            PRIMARY KEY (chat_id, user_id)
        );
        CREATE INDEX IF NOT EXISTS idx_conversation_state_updated
            ON conversation_state(updated_at);",
    )?;
    Ok(())
}
