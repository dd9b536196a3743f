use std::sync::Mutex;

use chrono::{Duration, Utc};
use rusqlite::Connection;
use tracing::{debug, info, instrument};

use crate::error::{Result, SessionError};
use crate::types::{Conversation, ConversationState};

/// Thread-safe manager for the per-conversation state machine (spec §4.2).
///
/// Wraps a single SQLite connection in a `Mutex`, the same pattern the
/// scheduler and users crates use for their own connections.
pub struct SessionManager {
    db: Mutex<Connection>,
}

impl SessionManager {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Return the conversation for `(chat_id, user_id)`, or the implicit
    /// `SelectingScenario` default if no row exists yet.
    #[instrument(skip(self), fields(chat_id, user_id))]
    pub fn get_or_default(&self, chat_id: &str, user_id: &str) -> Result<Conversation> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT chat_id, user_id, payload, created_at, updated_at
             FROM conversation_state WHERE chat_id = ?1 AND user_id = ?2",
            rusqlite::params![chat_id, user_id],
            row_to_conversation,
        ) {
            Ok(c) => Ok(c),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                let now = Utc::now().to_rfc3339();
                Ok(Conversation {
                    chat_id: chat_id.to_string(),
                    user_id: user_id.to_string(),
                    state: ConversationState::default(),
                    created_at: now.clone(),
                    updated_at: now,
                })
            }
            Err(e) => Err(SessionError::Database(e)),
        }
    }

    /// Persist a new state for `(chat_id, user_id)` (upsert). Always bumps
    /// `updated_at`, which drives the 1h TTL sweep.
    #[instrument(skip(self, state), fields(chat_id, user_id, state = state.discriminant()))]
    pub fn set_state(&self, chat_id: &str, user_id: &str, state: &ConversationState) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let payload = serde_json::to_string(state)
            .map_err(|e| SessionError::CorruptState {
                chat_id: chat_id.to_string(),
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })?;
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO conversation_state (chat_id, user_id, state, payload, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(chat_id, user_id) DO UPDATE SET
                state = excluded.state,
                payload = excluded.payload,
                updated_at = excluded.updated_at",
            rusqlite::params![chat_id, user_id, state.discriminant(), payload, now],
        )?;
        debug!("conversation state updated");
        Ok(())
    }

    /// Reset a conversation back to its implicit default by deleting the row
    /// (spec §4.2: `/start` always resets to `SelectingScenario`).
    #[instrument(skip(self), fields(chat_id, user_id))]
    pub fn reset(&self, chat_id: &str, user_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "DELETE FROM conversation_state WHERE chat_id = ?1 AND user_id = ?2",
            rusqlite::params![chat_id, user_id],
        )?;
        Ok(())
    }

    /// Expire conversations whose `updated_at` is older than `ttl_secs`
    /// (spec §4.2 1h TTL). Returns the number of rows swept.
    #[instrument(skip(self), fields(ttl_secs))]
    pub fn sweep_expired(&self, ttl_secs: i64) -> Result<usize> {
        let cutoff = (Utc::now() - Duration::seconds(ttl_secs)).to_rfc3339();
        let db = self.db.lock().unwrap();
        let swept = db.execute(
            "DELETE FROM conversation_state WHERE updated_at < ?1",
            rusqlite::params![cutoff],
        )?;
        if swept > 0 {
            info!(swept, "expired conversation states");
        }
        Ok(swept)
    }
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let payload: String = row.get(2)?;
    let state: ConversationState = serde_json::from_str(&payload).unwrap_or_default();
    Ok(Conversation {
        chat_id: row.get(0)?,
        user_id: row.get(1)?,
        state,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use forensics_core::Scenario;

    fn manager() -> SessionManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        SessionManager::new(conn)
    }

    #[test]
    fn missing_conversation_defaults_to_selecting_scenario() {
        let m = manager();
        let c = m.get_or_default("chat1", "user1").unwrap();
        assert_eq!(c.state, ConversationState::SelectingScenario);
    }

    #[test]
    fn set_then_get_round_trips() {
        let m = manager();
        let state = ConversationState::AnalysisInFlight {
            job_id: "job-1".into(),
            progress_msg_id: 99,
            scenario: Scenario::TeenagerSos,
        };
        m.set_state("chat1", "user1", &state).unwrap();
        let c = m.get_or_default("chat1", "user1").unwrap();
        assert_eq!(c.state, state);
    }

    #[test]
    fn reset_drops_back_to_default() {
        let m = manager();
        m.set_state("chat1", "user1", &ConversationState::TeenagerStopShown)
            .unwrap();
        m.reset("chat1", "user1").unwrap();
        let c = m.get_or_default("chat1", "user1").unwrap();
        assert_eq!(c.state, ConversationState::SelectingScenario);
    }

    #[test]
    fn sweep_expired_removes_stale_rows_only() {
        let m = manager();
        m.set_state("chat1", "user1", &ConversationState::TeenagerStopShown)
            .unwrap();
        // Force updated_at far into the past to simulate an expired row.
        {
            let db = m.db.lock().unwrap();
            db.execute(
                "UPDATE conversation_state SET updated_at = ?1",
                rusqlite::params![(Utc::now() - Duration::hours(2)).to_rfc3339()],
            )
            .unwrap();
        }
        let swept = m.sweep_expired(3600).unwrap();
        assert_eq!(swept, 1);
        let c = m.get_or_default("chat1", "user1").unwrap();
        assert_eq!(c.state, ConversationState::SelectingScenario);
    }
}
