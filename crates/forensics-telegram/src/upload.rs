//! Upload handler — the critical transition of the scenario state machine
//! (spec §4.2 "Upload handler"). Runs entirely inside the ingress task; the
//! only thing it hands off is the enqueued [`forensics_queue::Job`].

use std::sync::Arc;

use chrono::Utc;
use forensics_core::Scenario;
use forensics_detection::{fuse, DetectorSignals, ExtractedMetadata, VisualWatermark};
use forensics_notify::{render_result, RenderInput};
use forensics_queue::NewJob;
use forensics_sessions::ConversationState;
use forensics_users::UserError;
use forensics_worker::{analysis_id_for, compute_sha256_hex, AnalysisRecord};
use teloxide::prelude::*;
use tracing::warn;
use uuid::Uuid;

use crate::attach::InboundImage;
use crate::context::TelegramAppContext;
use crate::keyboard::to_markup;
use crate::send;

const ACCEPTED_FORMATS: &[&str] = &["jpg", "png", "heic", "webp"];

pub enum UploadOutcome {
    /// Job enqueued; conversation should move to `AnalysisInFlight`.
    Enqueued { job_id: String, progress_msg_id: i64 },
    /// Quota exhausted before anything else happened — no state change.
    QuotaExhausted { message: String },
    /// Validation, storage, or queue failure — quota already refunded.
    Rejected { message: String },
    /// The validation-time watermark prefilter matched (spec §4.2 step 2):
    /// remote analysis was skipped entirely and the result already
    /// delivered; conversation should move to `ReviewingResult`.
    ShortCircuited { analysis_id: String },
}

/// Execute spec §4.2 steps 1-7 for an inbound image.
///
/// The duplicate-upload check (§4.2 step 3) already ran as ingress
/// middleware (spec §4.1 fixed order: log -> rate-limit -> duplicate-upload
/// -> state dispatch) before this function is ever called — `phash` is
/// passed in rather than recomputed.
pub async fn handle_upload<C: TelegramAppContext>(
    bot: &Bot,
    ctx: &Arc<C>,
    chat_id: ChatId,
    user_id: &str,
    image: InboundImage,
    phash: u64,
    scenario: Scenario,
) -> UploadOutcome {
    // Step 1: decrement tier-gated daily quota atomically.
    let user = match ctx.users().decrement_quota(user_id) {
        Ok(user) => user,
        Err(UserError::QuotaExhausted { remaining, reset_date }) => {
            return UploadOutcome::QuotaExhausted {
                message: format!(
                    "You've used today's free analyses ({remaining} remaining, resets {}).",
                    reset_date.as_deref().unwrap_or("tomorrow")
                ),
            };
        }
        Err(e) => {
            warn!(user_id, error = %e, "quota decrement failed, failing open");
            return UploadOutcome::Rejected {
                message: "Something went wrong. Please try again.".to_string(),
            };
        }
    };

    // Step 2: pre-validate. Size is already bounded by attach::extract_image;
    // format is implied by the extension extract_image assigned.
    if image.bytes.len() as u64 > ctx.max_upload_bytes() || !ACCEPTED_FORMATS.contains(&image.extension) {
        refund(ctx, user_id);
        return UploadOutcome::Rejected {
            message: "That image couldn't be processed — check the size and format and try again.".to_string(),
        };
    }

    // Step 2 (continued): cheap watermark prefilter. A known AI-generator
    // tag short-circuits straight to a verdict — remote analysis, blob
    // storage, and the queue are all skipped entirely.
    if let Some(wm) = forensics_store::scan_known_watermark(&image.bytes) {
        return deliver_short_circuit(bot, ctx, chat_id, user_id, scenario, &image.bytes, wm).await;
    }

    // Step 4: upload blob. `temp/` keys are swept by the object store's
    // 24h lifecycle rule (§3, §6) as a backstop to the worker's best-effort
    // delete on completion.
    let blob_key = format!("temp/{user_id}/{}.{}", Uuid::now_v7(), image.extension);
    if let Err(e) = ctx.blobs().put(&blob_key, image.bytes).await {
        warn!(user_id, blob_key, error = %e, "blob upload failed");
        refund(ctx, user_id);
        return UploadOutcome::Rejected {
            message: "We couldn't store your image right now. Please try again shortly.".to_string(),
        };
    }

    // Step 5: post the initial progress message.
    let progress_msg = match bot.send_message(chat_id, "Analysis in progress…").await {
        Ok(msg) => msg,
        Err(e) => {
            warn!(user_id, error = %e, "failed to post progress message");
            refund(ctx, user_id);
            return UploadOutcome::Rejected {
                message: "Something went wrong starting your analysis. Please try again.".to_string(),
            };
        }
    };

    // Step 6: enqueue.
    let new_job = NewJob {
        user_id: user_id.to_string(),
        chat_id: chat_id.0.to_string(),
        source_message_id: progress_msg.id.0 as i64,
        blob_key: blob_key.clone(),
        image_phash: phash,
        tier: user.tier,
        scenario,
        preserve_exif: image.preserve_exif,
    };

    let job = match ctx.queue().enqueue(new_job) {
        Ok(job) => job,
        Err(e) => {
            warn!(user_id, error = %e, "enqueue failed, queue likely at capacity");
            refund(ctx, user_id);
            let _ = ctx.blobs().delete(&blob_key).await;
            return UploadOutcome::Rejected {
                message: "We're temporarily overloaded. Please try again in a few minutes.".to_string(),
            };
        }
    };

    if let Err(e) = ctx.queue().set_progress_msg_id(&job.id, progress_msg.id.0 as i64) {
        warn!(job_id = %job.id, error = %e, "failed to record progress_msg_id");
    }

    UploadOutcome::Enqueued {
        job_id: job.id,
        progress_msg_id: progress_msg.id.0 as i64,
    }
}

/// The validation-time watermark prefilter matched: fuse a verdict directly
/// from the known tag, persist and render it exactly as the worker pipeline
/// would, and skip the blob store/queue/remote-analysis round trip entirely
/// (spec §4.2 step 2's short-circuit).
async fn deliver_short_circuit<C: TelegramAppContext>(
    bot: &Bot,
    ctx: &Arc<C>,
    chat_id: ChatId,
    user_id: &str,
    scenario: Scenario,
    image_bytes: &[u8],
    wm: forensics_store::KnownWatermark,
) -> UploadOutcome {
    let signals = DetectorSignals {
        ai_heuristic: 0.0,
        fft_score: 0.0,
        metadata_risk: 0.0,
        face_swap_score: 0.0,
        face_detected: false,
        visual_watermark: Some(VisualWatermark {
            generator: wm.generator,
            text: wm.text,
            location: "unknown".to_string(),
            confidence: 0.98,
        }),
        c2pa_watermark: false,
        ai_software_in_exif: false,
        screenshot_detected: false,
        red_flags: Vec::new(),
        metadata: ExtractedMetadata::default(),
    };
    let verdict_outcome = fuse(&signals);

    let image_sha256 = compute_sha256_hex(image_bytes);
    let analysis_id = analysis_id_for(&image_sha256, Utc::now().date_naive());

    let record = AnalysisRecord {
        analysis_id: analysis_id.clone(),
        user_id: user_id.to_string(),
        scenario,
        verdict: verdict_outcome.verdict,
        confidence: verdict_outcome.confidence,
        processing_time_ms: 0,
        result_blob: serde_json::json!({
            "reason": verdict_outcome.reason,
            "source": "validation_watermark_prefilter",
        }),
        image_sha256: image_sha256.clone(),
        created_at: Utc::now().to_rfc3339(),
    };

    if let Err(e) = ctx.analyses().insert(&record) {
        warn!(user_id, error = %e, "failed to persist watermark-prefilter analysis record");
    }

    let render_input = RenderInput {
        analysis_id: analysis_id.clone(),
        verdict: verdict_outcome.verdict,
        confidence: verdict_outcome.confidence,
        reason: verdict_outcome.reason,
        scenario,
        metadata: None,
        image_sha256,
        processing_time_ms: 0,
        red_flags: Vec::new(),
    };
    let rendered = render_result(&render_input, ctx.geo()).await;
    let keyboard = to_markup(&rendered.keyboard);
    send::send_with_keyboard(bot, chat_id, &rendered.body, keyboard).await;

    if let Err(e) = ctx.sessions().set_state(
        &chat_id.0.to_string(),
        user_id,
        &ConversationState::ReviewingResult {
            analysis_id: analysis_id.clone(),
            scenario,
        },
    ) {
        warn!(user_id, error = %e, "failed to transition conversation to ReviewingResult after watermark short-circuit");
    }

    UploadOutcome::ShortCircuited { analysis_id }
}

fn refund<C: TelegramAppContext>(ctx: &Arc<C>, user_id: &str) {
    if let Err(e) = ctx.users().refund_quota(user_id) {
        warn!(user_id, error = %e, "failed to refund quota after upload rejection");
    }
}
