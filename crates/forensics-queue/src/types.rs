use forensics_core::{Priority, Scenario, Tier};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a queued analysis job (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to be picked up, or waiting out a retry backoff.
    Pending,
    /// Currently being executed by a worker task.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully but within its retry budget — will retry.
    Failed,
    /// Exhausted its retry budget; kept for operator diagnosis (spec §4.3).
    DeadLetter,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::DeadLetter => "dead_letter",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "dead_letter" => Ok(JobStatus::DeadLetter),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// A persisted analysis job (spec §3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// UUIDv7 — primary key, time-sortable.
    pub id: String,
    pub user_id: String,
    pub chat_id: String,
    pub source_message_id: i64,
    /// Set once the "analysis in progress" message has been sent.
    pub progress_msg_id: Option<i64>,
    pub blob_key: String,
    /// Perceptual hash of the decoded upload (spec §4.1), recorded against
    /// the analysis_id once the worker finishes so future duplicate checks
    /// can resolve to a real record.
    pub image_phash: u64,
    pub tier: Tier,
    pub scenario: Scenario,
    pub preserve_exif: bool,
    pub priority: Priority,
    pub status: JobStatus,
    /// Number of dequeue attempts made so far (spec §4.3, max 3).
    pub attempts: u32,
    /// The job is not dequeued again before this instant — backoff delay.
    pub available_at: String,
    /// `analysis_id` once the job completes successfully.
    pub result: Option<String>,
    pub error_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
