use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use forensics_core::{Priority, Scenario, Tier};
use rusqlite::Connection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::init_db;
use crate::error::{QueueError, Result};
use crate::types::{Job, JobStatus};

/// New-job parameters accepted by [`JobQueue::enqueue`].
pub struct NewJob {
    pub user_id: String,
    pub chat_id: String,
    pub source_message_id: i64,
    pub blob_key: String,
    pub image_phash: u64,
    pub tier: Tier,
    pub scenario: Scenario,
    pub preserve_exif: bool,
}

/// Durable, priority-ordered job queue (spec §4.3). Strict priority: `high`
/// jobs are always dequeued before `default`, before `low` — never a
/// weighted/probabilistic choice.
pub struct JobQueue {
    conn: Arc<Mutex<Connection>>,
    retry_backoffs_secs: Vec<u64>,
    max_pending_jobs: i64,
}

impl JobQueue {
    pub fn new(conn: Connection, retry_backoffs_secs: Vec<u64>, max_pending_jobs: i64) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            retry_backoffs_secs,
            max_pending_jobs,
        })
    }

    /// Enqueue a new job. Refuses with `QueueFull` once the pending count
    /// crosses `max_pending_jobs` (spec §5 backpressure) — the caller is
    /// expected to refund the user's quota and report "temporarily overloaded".
    pub fn enqueue(&self, new_job: NewJob) -> Result<Job> {
        let conn = self.conn.lock().unwrap();

        let pending: i64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status IN ('pending', 'running')",
            [],
            |row| row.get(0),
        )?;
        if pending >= self.max_pending_jobs {
            return Err(QueueError::QueueFull);
        }

        let now = Utc::now().to_rfc3339();
        let priority = Priority::for_tier(new_job.tier);
        let job = Job {
            id: Uuid::now_v7().to_string(),
            user_id: new_job.user_id,
            chat_id: new_job.chat_id,
            source_message_id: new_job.source_message_id,
            progress_msg_id: None,
            blob_key: new_job.blob_key,
            image_phash: new_job.image_phash,
            tier: new_job.tier,
            scenario: new_job.scenario,
            preserve_exif: new_job.preserve_exif,
            priority,
            status: JobStatus::Pending,
            attempts: 0,
            available_at: now.clone(),
            result: None,
            error_reason: None,
            created_at: now.clone(),
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO jobs (
                id, user_id, chat_id, source_message_id, progress_msg_id, blob_key,
                image_phash, tier, scenario, preserve_exif, priority, status, attempts,
                available_at, result, error_reason, created_at, updated_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
            rusqlite::params![
                job.id,
                job.user_id,
                job.chat_id,
                job.source_message_id,
                job.progress_msg_id,
                job.blob_key,
                job.image_phash as i64,
                job.tier.to_string(),
                job.scenario.as_str(),
                job.preserve_exif as i32,
                job.priority.as_str(),
                job.status.to_string(),
                job.attempts,
                job.available_at,
                job.result,
                job.error_reason,
                job.created_at,
                job.updated_at,
            ],
        )?;

        info!(job_id = %job.id, priority = %job.priority, "job enqueued");
        Ok(job)
    }

    /// Record the progress-message id once the gateway has posted it, so the
    /// worker can edit it in place (spec §4.7).
    pub fn set_progress_msg_id(&self, job_id: &str, progress_msg_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE jobs SET progress_msg_id = ?2, updated_at = ?3 WHERE id = ?1",
            rusqlite::params![job_id, progress_msg_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Atomically claim the next job to run, trying `high` then `default`
    /// then `low` in strict order (spec §4.3) — never a single weighted query.
    pub fn dequeue_next(&self) -> Result<Option<Job>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        for priority in [Priority::High, Priority::Default, Priority::Low] {
            let claimed = conn.query_row(
                "SELECT id FROM jobs
                 WHERE status = 'pending' AND priority = ?1 AND available_at <= ?2
                 ORDER BY created_at ASC LIMIT 1",
                rusqlite::params![priority.as_str(), now],
                |row| row.get::<_, String>(0),
            );

            let id = match claimed {
                Ok(id) => id,
                Err(rusqlite::Error::QueryReturnedNoRows) => continue,
                Err(e) => return Err(e.into()),
            };

            conn.execute(
                "UPDATE jobs SET status = 'running', attempts = attempts + 1, updated_at = ?2
                 WHERE id = ?1",
                rusqlite::params![id, now],
            )?;

            return Ok(Some(load_job(&conn, &id)?));
        }

        Ok(None)
    }

    /// Mark a job completed, recording the `analysis_id` as its result.
    pub fn complete(&self, job_id: &str, analysis_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let n = conn.execute(
            "UPDATE jobs SET status = 'completed', result = ?2, updated_at = ?3 WHERE id = ?1",
            rusqlite::params![job_id, analysis_id, now],
        )?;
        if n == 0 {
            return Err(QueueError::JobNotFound { id: job_id.to_string() });
        }
        Ok(())
    }

    /// Record a failed attempt. Reschedules with backoff if attempts remain,
    /// otherwise moves the job to `dead_letter` for operator diagnosis
    /// (spec §4.3).
    pub fn fail(&self, job_id: &str, reason: &str) -> Result<JobStatus> {
        let conn = self.conn.lock().unwrap();
        let job = load_job(&conn, job_id)?;
        let now = Utc::now();

        let attempts = job.attempts as usize;
        let next_status = if attempts >= self.retry_backoffs_secs.len() {
            JobStatus::DeadLetter
        } else {
            JobStatus::Pending
        };

        let available_at = if next_status == JobStatus::Pending {
            let delay = self.retry_backoffs_secs[attempts - 1];
            (now + Duration::seconds(delay as i64)).to_rfc3339()
        } else {
            now.to_rfc3339()
        };

        conn.execute(
            "UPDATE jobs SET status = ?2, error_reason = ?3, available_at = ?4, updated_at = ?5
             WHERE id = ?1",
            rusqlite::params![job_id, next_status.to_string(), reason, available_at, now.to_rfc3339()],
        )?;

        if next_status == JobStatus::DeadLetter {
            warn!(job_id, attempts = job.attempts, reason, "job moved to dead letter");
        }

        Ok(next_status)
    }

    /// Number of jobs currently pending or running — used for the health
    /// endpoint's queue-depth metric and for backpressure decisions.
    pub fn pending_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status IN ('pending', 'running')",
            [],
            |row| row.get(0),
        )?)
    }

    /// Delete completed jobs older than `result_ttl_secs` (spec §4.3).
    pub fn sweep_completed(&self, result_ttl_secs: i64) -> Result<usize> {
        let cutoff = (Utc::now() - Duration::seconds(result_ttl_secs)).to_rfc3339();
        let conn = self.conn.lock().unwrap();
        Ok(conn.execute(
            "DELETE FROM jobs WHERE status = 'completed' AND updated_at < ?1",
            rusqlite::params![cutoff],
        )?)
    }

    /// Delete dead-letter jobs older than `failure_ttl_secs` (spec §4.3).
    pub fn sweep_dead_letters(&self, failure_ttl_secs: i64) -> Result<usize> {
        let cutoff = (Utc::now() - Duration::seconds(failure_ttl_secs)).to_rfc3339();
        let conn = self.conn.lock().unwrap();
        Ok(conn.execute(
            "DELETE FROM jobs WHERE status = 'dead_letter' AND updated_at < ?1",
            rusqlite::params![cutoff],
        )?)
    }
}

fn load_job(conn: &Connection, id: &str) -> Result<Job> {
    use std::str::FromStr;
    conn.query_row(
        "SELECT id, user_id, chat_id, source_message_id, progress_msg_id, blob_key,
                image_phash, tier, scenario, preserve_exif, priority, status, attempts,
                available_at, result, error_reason, created_at, updated_at
         FROM jobs WHERE id = ?1",
        rusqlite::params![id],
        |row| {
            Ok(Job {
                id: row.get(0)?,
                user_id: row.get(1)?,
                chat_id: row.get(2)?,
                source_message_id: row.get(3)?,
                progress_msg_id: row.get(4)?,
                blob_key: row.get(5)?,
                image_phash: row.get::<_, i64>(6)? as u64,
                tier: Tier::from_str(&row.get::<_, String>(7)?).unwrap_or_default(),
                scenario: Scenario::coerce(Some(&row.get::<_, String>(8)?)),
                preserve_exif: row.get::<_, i32>(9)? != 0,
                priority: Priority::from_str(&row.get::<_, String>(10)?).unwrap_or(Priority::Default),
                status: JobStatus::from_str(&row.get::<_, String>(11)?).unwrap_or(JobStatus::Pending),
                attempts: row.get(12)?,
                available_at: row.get(13)?,
                result: row.get(14)?,
                error_reason: row.get(15)?,
                created_at: row.get(16)?,
                updated_at: row.get(17)?,
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => QueueError::JobNotFound { id: id.to_string() },
        other => QueueError::Database(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> JobQueue {
        let conn = Connection::open_in_memory().unwrap();
        JobQueue::new(conn, vec![10, 30, 60], 500).unwrap()
    }

    fn sample(tier: Tier) -> NewJob {
        NewJob {
            user_id: "u1".into(),
            chat_id: "c1".into(),
            source_message_id: 1,
            blob_key: "blob-1".into(),
            image_phash: 0xABCD,
            tier,
            scenario: Scenario::General,
            preserve_exif: false,
        }
    }

    #[test]
    fn high_priority_dequeues_before_default() {
        let q = queue();
        q.enqueue(sample(Tier::Free)).unwrap();
        let high_job = q.enqueue(sample(Tier::Pro)).unwrap();

        let dequeued = q.dequeue_next().unwrap().unwrap();
        assert_eq!(dequeued.id, high_job.id);
        assert_eq!(dequeued.priority, Priority::High);
    }

    #[test]
    fn fail_reschedules_with_backoff_until_dead_letter() {
        let q = queue();
        let job = q.enqueue(sample(Tier::Free)).unwrap();

        q.dequeue_next().unwrap();
        assert_eq!(q.fail(&job.id, "timeout").unwrap(), JobStatus::Pending);

        // Force availability so the retry can be claimed again immediately.
        {
            let conn = q.conn.lock().unwrap();
            conn.execute("UPDATE jobs SET available_at = ?1 WHERE id = ?2",
                rusqlite::params![Utc::now().to_rfc3339(), job.id]).unwrap();
        }
        q.dequeue_next().unwrap();
        assert_eq!(q.fail(&job.id, "timeout").unwrap(), JobStatus::Pending);

        {
            let conn = q.conn.lock().unwrap();
            conn.execute("UPDATE jobs SET available_at = ?1 WHERE id = ?2",
                rusqlite::params![Utc::now().to_rfc3339(), job.id]).unwrap();
        }
        q.dequeue_next().unwrap();
        assert_eq!(q.fail(&job.id, "timeout").unwrap(), JobStatus::DeadLetter);
    }

    #[test]
    fn enqueue_refuses_past_capacity() {
        let conn = Connection::open_in_memory().unwrap();
        let q = JobQueue::new(conn, vec![10], 1).unwrap();
        q.enqueue(sample(Tier::Free)).unwrap();
        let err = q.enqueue(sample(Tier::Free)).unwrap_err();
        assert!(matches!(err, QueueError::QueueFull));
    }
}
