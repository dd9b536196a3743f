use forensics_core::Tier;
use serde::{Deserialize, Serialize};

/// Full user record. Stored in SQLite; loaded into memory only when active.
///
/// `daily_quota_remaining` is decremented atomically on upload and refunded
/// on any worker failure (spec §3, §4.4). `quota_reset_date` tracks the last
/// calendar day the quota was topped up — rolled over lazily on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUIDv7 — time-sortable, useful for log correlation across channels.
    pub id: String,
    pub tier: Tier,
    pub daily_quota_remaining: i64,
    /// ISO-8601 date string (YYYY-MM-DD); quota resets when wall-clock date differs.
    pub quota_reset_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Maps an external channel identity (e.g. Telegram user_id) to a bot user.
///
/// One user has exactly one identity per channel; the bot is single-channel
/// today (Telegram) but the table generalizes the same way the rest of the
/// pipeline does so adding a channel later is additive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub user_id: String,
    /// Channel name, e.g. "telegram".
    pub channel: String,
    /// Opaque identifier within that channel (e.g. Telegram numeric user id).
    pub identifier: String,
    pub created_at: String,
}
