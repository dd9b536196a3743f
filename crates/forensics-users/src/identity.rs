use chrono::Utc;
use forensics_core::Tier;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::{row_to_user, USER_SELECT_SQL};
use crate::error::{Result, UserError};
use crate::types::{User, UserIdentity};

/// Insert a brand-new user row with a full quota for today.
pub fn create_user(conn: &Connection, daily_free_quota: i64) -> Result<User> {
    let now = Utc::now().to_rfc3339();
    let today = Utc::now().format("%Y-%m-%d").to_string();
    let user = User {
        id: Uuid::now_v7().to_string(),
        tier: Tier::Free,
        daily_quota_remaining: daily_free_quota,
        quota_reset_date: Some(today),
        created_at: now.clone(),
        updated_at: now,
    };
    conn.execute(
        "INSERT INTO users (id, tier, daily_quota_remaining, quota_reset_date, created_at, updated_at)
         VALUES (?1,?2,?3,?4,?5,?6)",
        params![
            user.id,
            user.tier.to_string(),
            user.daily_quota_remaining,
            user.quota_reset_date,
            user.created_at,
            user.updated_at,
        ],
    )?;
    Ok(user)
}

/// Load a user by primary key. Returns None instead of an error when absent
/// so callers decide whether missing is exceptional in their context.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let mut stmt = conn.prepare(USER_SELECT_SQL)?;
    match stmt.query_row(params![user_id], row_to_user) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(UserError::DatabaseError(e)),
    }
}

/// Register a new channel identity for an existing user. The UNIQUE constraint
/// on (channel, identifier) prevents duplicate links at the DB level.
pub fn add_identity(
    conn: &Connection,
    user_id: &str,
    channel: &str,
    identifier: &str,
) -> Result<UserIdentity> {
    let now = Utc::now().to_rfc3339();
    let identity = UserIdentity {
        id: Uuid::now_v7().to_string(),
        user_id: user_id.to_string(),
        channel: channel.to_string(),
        identifier: identifier.to_string(),
        created_at: now,
    };
    conn.execute(
        "INSERT INTO user_identities (id, user_id, channel, identifier, created_at)
         VALUES (?1,?2,?3,?4,?5)",
        params![
            identity.id,
            identity.user_id,
            identity.channel,
            identity.identifier,
            identity.created_at,
        ],
    )?;
    Ok(identity)
}

/// Cross-channel lookup: given a channel + external identifier, return the
/// owning user. Hot path: called on every inbound message.
pub fn find_user_by_identity(
    conn: &Connection,
    channel: &str,
    identifier: &str,
) -> Result<Option<User>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.tier, u.daily_quota_remaining, u.quota_reset_date, u.created_at, u.updated_at
         FROM users u
         JOIN user_identities i ON i.user_id = u.id
         WHERE i.channel = ?1 AND i.identifier = ?2",
    )?;
    match stmt.query_row(params![channel, identifier], row_to_user) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(UserError::DatabaseError(e)),
    }
}

/// Return all identities linked to a given user.
pub fn list_identities_for_user(conn: &Connection, user_id: &str) -> Result<Vec<UserIdentity>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, channel, identifier, created_at
         FROM user_identities WHERE user_id = ?1
         ORDER BY created_at ASC",
    )?;
    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok(UserIdentity {
                id: row.get(0)?,
                user_id: row.get(1)?,
                channel: row.get(2)?,
                identifier: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Roll the daily quota over to `daily_free_quota` if the stored reset date
/// isn't today. Called before every quota check/decrement so the rollover is
/// never observed as a stale value by the caller.
fn rollover_if_needed(conn: &Connection, user: &mut User, daily_free_quota: i64) -> Result<()> {
    let today = Utc::now().format("%Y-%m-%d").to_string();
    if user.quota_reset_date.as_deref() != Some(today.as_str()) {
        user.daily_quota_remaining = daily_free_quota;
        user.quota_reset_date = Some(today.clone());
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE users SET daily_quota_remaining=?2, quota_reset_date=?3, updated_at=?4 WHERE id=?1",
            params![user.id, user.daily_quota_remaining, today, now],
        )?;
    }
    Ok(())
}

/// Atomically decrement a user's daily quota by one, rolling the quota over
/// first if the calendar day has turned. Pro-tier users are never rate
/// limited by quota (spec §3 "tier drives priority and quota").
///
/// Returns the updated user on success, or `UserError::QuotaExhausted` if
/// the user has none remaining today.
pub fn decrement_quota(conn: &Connection, user_id: &str, daily_free_quota: i64) -> Result<User> {
    let mut user = get_user(conn, user_id)?.ok_or_else(|| UserError::NotFound(user_id.to_string()))?;

    if user.tier == Tier::Pro {
        return Ok(user);
    }

    rollover_if_needed(conn, &mut user, daily_free_quota)?;

    if user.daily_quota_remaining <= 0 {
        return Err(UserError::QuotaExhausted {
            remaining: user.daily_quota_remaining,
            reset_date: user.quota_reset_date,
        });
    }

    user.daily_quota_remaining -= 1;
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE users SET daily_quota_remaining=?2, updated_at=?3 WHERE id=?1",
        params![user.id, user.daily_quota_remaining, now],
    )?;
    user.updated_at = now;
    Ok(user)
}

/// Refund one unit of quota — called when a job fails for reasons not
/// attributable to the user (spec §4.4, §5 backpressure).
///
/// Rolls the quota over first, same as `decrement_quota`, then clamps the
/// refund at `daily_free_quota` — a refund landing after the calendar day
/// has already turned (a fresh roll already set `daily_quota_remaining` to
/// the new day's full allotment) must not push the user above their cap.
pub fn refund_quota(conn: &Connection, user_id: &str, daily_free_quota: i64) -> Result<()> {
    let mut user = get_user(conn, user_id)?.ok_or_else(|| UserError::NotFound(user_id.to_string()))?;
    if user.tier == Tier::Pro {
        return Ok(());
    }
    rollover_if_needed(conn, &mut user, daily_free_quota)?;

    let refunded = (user.daily_quota_remaining + 1).min(daily_free_quota);
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE users SET daily_quota_remaining=?2, updated_at=?3 WHERE id=?1",
        params![user_id, refunded, now],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        conn
    }

    #[test]
    fn decrement_and_refund_round_trips() {
        let conn = test_conn();
        let user = create_user(&conn, 3).unwrap();
        let after = decrement_quota(&conn, &user.id, 3).unwrap();
        assert_eq!(after.daily_quota_remaining, 2);
        refund_quota(&conn, &user.id, 3).unwrap();
        let reloaded = get_user(&conn, &user.id).unwrap().unwrap();
        assert_eq!(reloaded.daily_quota_remaining, 3);
    }

    #[test]
    fn refund_does_not_exceed_daily_quota() {
        let conn = test_conn();
        let user = create_user(&conn, 3).unwrap();
        refund_quota(&conn, &user.id, 3).unwrap();
        let reloaded = get_user(&conn, &user.id).unwrap().unwrap();
        assert_eq!(reloaded.daily_quota_remaining, 3);
    }

    #[test]
    fn quota_exhausted_errors_at_zero() {
        let conn = test_conn();
        let user = create_user(&conn, 1).unwrap();
        decrement_quota(&conn, &user.id, 1).unwrap();
        let err = decrement_quota(&conn, &user.id, 1).unwrap_err();
        assert!(matches!(err, UserError::QuotaExhausted { .. }));
    }

    #[test]
    fn pro_tier_is_never_exhausted() {
        let conn = test_conn();
        let mut user = create_user(&conn, 0).unwrap();
        user.tier = Tier::Pro;
        conn.execute(
            "UPDATE users SET tier='pro' WHERE id=?1",
            params![user.id],
        )
        .unwrap();
        let after = decrement_quota(&conn, &user.id, 0).unwrap();
        assert_eq!(after.tier, Tier::Pro);
    }
}
