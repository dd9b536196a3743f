use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use forensics_detection::{fuse, red_flag_candidates, AnalysisClient, AnalysisRequest};
use forensics_notify::{render_result, GeoResolver, RenderInput};
use forensics_queue::{Job, JobQueue, JobStatus};
use forensics_store::{BlobStore, DuplicateIndex};
use forensics_users::UserResolver;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::analyses::{analysis_id_for, compute_sha256_hex, AnalysesRepo, AnalysisRecord};
use crate::stage::Stage;
use crate::traits::{ProgressSink, ResultSink};

/// Micro-retry backoffs for the blob-retrieval stage (spec §4.4 step 2:
/// "network retry up to 3x with exponential backoff"). The spec gives no
/// concrete numbers for this stage (unlike the job-level retry policy in
/// §4.3) — these are deliberately short since the caller is still inside
/// the per-job timeout budget.
const BLOB_RETRY_BACKOFFS: [Duration; 3] = [
    Duration::from_millis(200),
    Duration::from_millis(500),
    Duration::from_millis(1000),
];

/// Persistence-retry attempts for step 6 (§7 `PersistenceError`: "retry
/// persistence; still notify the user regardless").
const PERSIST_RETRY_BACKOFFS: [Duration; 2] =
    [Duration::from_millis(200), Duration::from_millis(500)];

/// One worker instance (§5: "three worker instances by default; scale
/// horizontally"). Every stage of a job runs inside this single async
/// context — see §4.4, §9: spawning fresh contexts per sub-operation is
/// what corrupted the original's relational client.
pub struct Worker {
    pub id: usize,
    pub queue: Arc<JobQueue>,
    pub blobs: Arc<dyn BlobStore>,
    pub analysis_client: Arc<dyn AnalysisClient>,
    pub users: Arc<UserResolver>,
    pub analyses: Arc<AnalysesRepo>,
    pub dedup: Arc<DuplicateIndex>,
    pub progress: Arc<dyn ProgressSink>,
    pub results: Arc<dyn ResultSink>,
    pub geo: Arc<dyn GeoResolver>,
    pub job_timeout: Duration,
    pub analysis_timeout: Duration,
}

impl Worker {
    /// Poll loop: one tick per second, at most one job in flight per
    /// worker instance at a time (mirrors the teacher scheduler's tick
    /// cadence, applied here to job dequeue instead of cron firing).
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(worker = self.id, "analysis worker started");
        let mut interval = tokio::time::interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(worker = self.id, "analysis worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn tick(&self) {
        let job = match self.queue.dequeue_next() {
            Ok(Some(job)) => job,
            Ok(None) => return,
            Err(e) => {
                error!(worker = self.id, error = %e, "dequeue failed");
                return;
            }
        };

        let job_id = job.id.clone();
        match tokio::time::timeout(self.job_timeout, self.process_job(&job)).await {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => self.fail_job(&job_id, &reason),
            Err(_) => self.fail_job(&job_id, "job exceeded the per-job execution timeout"),
        }
    }

    fn fail_job(&self, job_id: &str, reason: &str) {
        match self.queue.fail(job_id, reason) {
            Ok(JobStatus::DeadLetter) => {
                warn!(job_id, reason, "job moved to dead-letter after exhausting retries")
            }
            Ok(_) => info!(job_id, reason, "job failed, will retry"),
            Err(e) => error!(job_id, error = %e, "failed to record job failure"),
        }
    }

    async fn emit_stage(&self, job: &Job, stage: Stage) {
        if let Some(progress_msg_id) = job.progress_msg_id {
            self.progress
                .edit_stage(&job.chat_id, progress_msg_id, stage)
                .await;
        }
    }

    /// The full pipeline (§4.4). `Err` carries a short internal reason for
    /// `JobQueue::fail` — never shown to the user (user-facing messages are
    /// sent separately via `self.results` before returning).
    async fn process_job(&self, job: &Job) -> std::result::Result<(), String> {
        // Step 1, "validate scenario is in the closed enum": `Job::scenario`
        // is a `Scenario`, not a string — an ill-formed value cannot reach
        // this point (`Scenario::coerce` already ran when the row was loaded).
        self.emit_stage(job, Stage::Preparing).await;
        self.emit_stage(job, Stage::Downloading).await;

        let bytes = match self.download_with_retry(&job.blob_key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.refund_quota(job);
                self.results
                    .deliver_transient_failure(
                        job,
                        "We couldn't retrieve your image. Please try uploading it again.",
                    )
                    .await;
                return Err(format!("blob retrieval failed: {e}"));
            }
        };

        self.emit_stage(job, Stage::ExifExtraction).await;
        self.emit_stage(job, Stage::AiDetection).await;

        let request = AnalysisRequest::new(job.preserve_exif);
        let outcome = match tokio::time::timeout(
            self.analysis_timeout,
            self.analysis_client.analyze(bytes.clone(), request),
        )
        .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                self.refund_quota(job);
                self.results
                    .deliver_transient_failure(job, "Analysis failed. Please try again shortly.")
                    .await;
                return Err(format!("analysis API error: {e}"));
            }
            Err(_) => {
                self.refund_quota(job);
                self.results
                    .deliver_transient_failure(
                        job,
                        "Analysis took too long to complete. Please try again.",
                    )
                    .await;
                return Err("analysis API timed out".to_string());
            }
        };

        let image_sha256 = compute_sha256_hex(&bytes);
        let analysis_id = analysis_id_for(&image_sha256, Utc::now().date_naive());

        if let Err(e) = self.dedup.record(&job.user_id, job.image_phash, &analysis_id) {
            warn!(job_id = %job.id, error = %e, "failed to record perceptual hash for duplicate detection");
        }

        self.emit_stage(job, Stage::FrequencyAnalysis).await;
        self.emit_stage(job, Stage::FinalScoring).await;

        let verdict_outcome = fuse(&outcome.signals);
        let red_flags = red_flag_candidates(&outcome.signals);

        let record = AnalysisRecord {
            analysis_id: analysis_id.clone(),
            user_id: job.user_id.clone(),
            scenario: job.scenario,
            verdict: verdict_outcome.verdict,
            confidence: verdict_outcome.confidence,
            processing_time_ms: outcome.processing_time_ms,
            result_blob: serde_json::json!({
                "reason": verdict_outcome.reason,
                "ai_heuristic": outcome.signals.ai_heuristic,
                "fft_score": outcome.signals.fft_score,
                "metadata_risk": outcome.signals.metadata_risk,
                "face_swap_score": outcome.signals.face_swap_score,
            }),
            image_sha256: image_sha256.clone(),
            created_at: Utc::now().to_rfc3339(),
        };

        // Persistence failure does not block notification (§7 PersistenceError).
        self.persist_with_retry(&record).await;

        let render_input = RenderInput {
            analysis_id: analysis_id.clone(),
            verdict: verdict_outcome.verdict,
            confidence: verdict_outcome.confidence,
            reason: verdict_outcome.reason,
            scenario: job.scenario,
            metadata: Some(outcome.signals.metadata.clone()),
            image_sha256,
            processing_time_ms: outcome.processing_time_ms,
            red_flags,
        };
        let rendered = render_result(&render_input, self.geo.as_ref()).await;
        self.results.deliver_result(job, &analysis_id, rendered).await;

        self.queue
            .complete(&job.id, &analysis_id)
            .map_err(|e| format!("failed to mark job complete: {e}"))?;

        if let Err(e) = self.blobs.delete(&job.blob_key).await {
            warn!(blob_key = %job.blob_key, error = %e, "best-effort blob deletion failed, relying on bucket TTL");
        }

        Ok(())
    }

    async fn download_with_retry(
        &self,
        blob_key: &str,
    ) -> std::result::Result<Vec<u8>, forensics_store::StoreError> {
        match self.blobs.get(blob_key).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) => warn!(blob_key, attempt = 0usize, error = %e, "blob retrieval attempt failed"),
        }

        let mut last_err = None;
        for (i, backoff) in BLOB_RETRY_BACKOFFS.iter().enumerate() {
            tokio::time::sleep(*backoff).await;
            match self.blobs.get(blob_key).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    warn!(blob_key, attempt = i + 1, error = %e, "blob retrieval attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.expect("at least one retry attempt recorded an error"))
    }

    async fn persist_with_retry(&self, record: &AnalysisRecord) {
        if self.analyses.insert(record).is_ok() {
            return;
        }
        for backoff in PERSIST_RETRY_BACKOFFS {
            tokio::time::sleep(backoff).await;
            if self.analyses.insert(record).is_ok() {
                return;
            }
        }
        error!(
            analysis_id = %record.analysis_id,
            "persistence failed after retries; analysis was already delivered to the user and is reconstructible from logs"
        );
    }

    fn refund_quota(&self, job: &Job) {
        if let Err(e) = self.users.refund_quota(&job.user_id) {
            error!(user_id = %job.user_id, error = %e, "failed to refund quota after pipeline failure");
        }
    }
}
