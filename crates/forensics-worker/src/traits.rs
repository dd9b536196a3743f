use async_trait::async_trait;
use forensics_notify::RenderedMessage;
use forensics_queue::Job;

use crate::stage::Stage;

/// Edits the single progress message in place (§4.7). Implementations MUST
/// swallow their own errors — a failed edit must never fail the analysis;
/// log a warning and move on.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn edit_stage(&self, chat_id: &str, progress_msg_id: i64, stage: Stage);
}

/// Delivers the worker's outcome back to the chat (§4.4 steps 3, 7).
/// Implementations MUST swallow their own errors (§7 `NotificationError`:
/// log, no retry — the conversation state will eventually time out).
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver_result(&self, job: &Job, analysis_id: &str, rendered: RenderedMessage);
    async fn deliver_transient_failure(&self, job: &Job, message: &str);
}
