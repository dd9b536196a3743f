//! Telegram message and callback handlers registered in the teloxide
//! Dispatcher (spec §4.1, §4.2).
//!
//! Every inbound event runs the fixed middleware order: log -> rate-limit
//! -> duplicate-upload -> state dispatch. Middlewares short-circuit with a
//! user-visible reply and suppress dispatch on rejection.

use std::sync::Arc;
use std::time::Instant;

use forensics_core::{anonymize_user_id, Scenario};
use forensics_sessions::ConversationState;
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::attach;
use crate::context::TelegramAppContext;
use crate::keyboard::{self, SELECT_ADULT, SELECT_GENERAL, SELECT_TEENAGER, TEENAGER_READY};
use crate::send;
use crate::upload::{self, UploadOutcome};

const START_PROMPT: &str = "Welcome. Choose what you'd like help with:";
const ADULT_EVIDENCE_PROMPT: &str =
    "Send the screenshot or photo you'd like analyzed. It stays private to this conversation.";
const TEENAGER_STOP_MESSAGE: &str =
    "Stop. You are safe, and whatever is happening is not your fault. When you're ready, tap the button below and send the photo.";
const TEENAGER_PHOTO_PROMPT: &str = "Send the photo now and I'll take a look.";
const GENERAL_PROMPT: &str = "Send an image and I'll check it for signs of AI generation or manipulation.";
const UNHANDLED_UPLOAD_HINT: &str =
    "I wasn't expecting an image just now. Let's start over — choose what you'd like help with:";
const ANALYSIS_IN_FLIGHT_HINT: &str = "Still working on your last image — I'll let you know as soon as it's done.";

/// Main message handler.
pub async fn handle_message<C: TelegramAppContext + 'static>(
    bot: Bot,
    msg: Message,
    ctx: Arc<C>,
) -> ResponseResult<()> {
    if msg.from.as_ref().map(|u| u.is_bot).unwrap_or(false) {
        return Ok(());
    }
    let from = match msg.from.as_ref() {
        Some(u) => u,
        None => return Ok(()),
    };

    let started = Instant::now();
    let telegram_user_id = from.id.0.to_string();
    let user_id = match ctx.users().resolve("telegram", &telegram_user_id) {
        Ok(resolved) => resolved.user().id.clone(),
        Err(e) => {
            warn!(error = %e, "user resolution failed, falling back to raw telegram id");
            telegram_user_id.clone()
        }
    };
    let chat_id = msg.chat.id;

    // Rate-limit middleware.
    if !ctx.rate_limiter().check_and_record(&user_id) {
        let wait = ctx.rate_limiter().retry_after_secs(&user_id).unwrap_or(60);
        send::send_response(&bot, chat_id, &format!("Too many requests, wait {wait} seconds.")).await;
        log_event(&user_id, "message", started);
        return Ok(());
    }

    let text = msg.text().unwrap_or("").trim().to_string();

    if text.eq_ignore_ascii_case("/start") {
        if let Err(e) = ctx.sessions().reset(&chat_id.0.to_string(), &user_id) {
            warn!(error = %e, "failed to reset conversation state on /start");
        }
        bot.send_message(chat_id, START_PROMPT)
            .reply_markup(keyboard::scenario_menu())
            .await?;
        log_event(&user_id, "message", started);
        return Ok(());
    }

    let image = attach::extract_image(&bot, &msg, ctx.max_upload_bytes()).await;

    // Duplicate-upload middleware — only applies to image uploads. A failed
    // hash gets a random stand-in rather than a constant: two images that
    // both fail to hash for the same user must never collide as duplicates.
    let mut phash = 0u64;
    if let Some(inbound) = &image {
        phash = match forensics_store::phash::compute(&inbound.bytes) {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "perceptual hash failed, treating upload as unique");
                uuid::Uuid::new_v4().as_u64_pair().0
            }
        };
        match ctx.dedup().check(&user_id, phash) {
            Ok(Some(analysis_id)) => {
                send::send_response(
                    &bot,
                    chat_id,
                    &format!("Duplicate detected; reusing prior analysis <code>{analysis_id}</code>."),
                )
                .await;
                log_event(&user_id, "document_upload", started);
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "duplicate-upload index check failed, failing open"),
        }
    }

    // State dispatch.
    let conversation = match ctx.sessions().get_or_default(&chat_id.0.to_string(), &user_id) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "failed to load conversation state, defaulting to SelectingScenario");
            forensics_sessions::Conversation {
                chat_id: chat_id.0.to_string(),
                user_id: user_id.clone(),
                state: ConversationState::SelectingScenario,
                created_at: String::new(),
                updated_at: String::new(),
            }
        }
    };

    match (conversation.state, image) {
        (ConversationState::SelectingScenario, Some(inbound)) => {
            start_upload(&bot, &ctx, chat_id, &user_id, inbound, phash, Scenario::General).await;
        }
        (ConversationState::AdultWaitingForEvidence, Some(inbound)) => {
            start_upload(&bot, &ctx, chat_id, &user_id, inbound, phash, Scenario::AdultBlackmail).await;
        }
        (ConversationState::TeenagerWaitingForPhoto, Some(inbound)) => {
            start_upload(&bot, &ctx, chat_id, &user_id, inbound, phash, Scenario::TeenagerSos).await;
        }
        (_, Some(_)) => {
            // any --unhandled upload in legacy state--> SelectingScenario with hint
            if let Err(e) = ctx.sessions().reset(&chat_id.0.to_string(), &user_id) {
                warn!(error = %e, "failed to reset conversation after unhandled upload");
            }
            let hint = if matches!(conversation.state, ConversationState::AnalysisInFlight { .. }) {
                ANALYSIS_IN_FLIGHT_HINT
            } else {
                UNHANDLED_UPLOAD_HINT
            };
            bot.send_message(chat_id, hint).reply_markup(keyboard::scenario_menu()).await?;
        }
        (ConversationState::SelectingScenario, None) => {
            if !text.is_empty() {
                bot.send_message(chat_id, START_PROMPT)
                    .reply_markup(keyboard::scenario_menu())
                    .await?;
            }
        }
        (_, None) => {}
    }

    log_event(&user_id, "message", started);
    Ok(())
}

async fn start_upload<C: TelegramAppContext + 'static>(
    bot: &Bot,
    ctx: &Arc<C>,
    chat_id: ChatId,
    user_id: &str,
    inbound: attach::InboundImage,
    phash: u64,
    scenario: Scenario,
) {
    match upload::handle_upload(bot, ctx, chat_id, user_id, inbound, phash, scenario).await {
        UploadOutcome::Enqueued { job_id, progress_msg_id } => {
            if let Err(e) = ctx.sessions().set_state(
                &chat_id.0.to_string(),
                user_id,
                &ConversationState::AnalysisInFlight {
                    job_id,
                    progress_msg_id,
                    scenario,
                },
            ) {
                warn!(error = %e, "failed to transition conversation to AnalysisInFlight");
            }
        }
        UploadOutcome::QuotaExhausted { message } | UploadOutcome::Rejected { message } => {
            send::send_response(bot, chat_id, &message).await;
        }
        // The watermark prefilter already rendered and sent the result and
        // transitioned the conversation to `ReviewingResult` itself.
        UploadOutcome::ShortCircuited { .. } => {}
    }
}

/// Callback-query handler (inline keyboard button presses).
pub async fn handle_callback<C: TelegramAppContext + 'static>(
    bot: Bot,
    query: CallbackQuery,
    ctx: Arc<C>,
) -> ResponseResult<()> {
    let started = Instant::now();
    let telegram_user_id = query.from.id.0.to_string();
    let user_id = match ctx.users().resolve("telegram", &telegram_user_id) {
        Ok(resolved) => resolved.user().id.clone(),
        Err(_) => telegram_user_id.clone(),
    };

    let chat_id = match query.message.as_ref().map(|m| m.chat().id) {
        Some(id) => id,
        None => {
            bot.answer_callback_query(query.id).await?;
            return Ok(());
        }
    };

    bot.answer_callback_query(query.id.clone()).await.ok();

    if !ctx.rate_limiter().check_and_record(&user_id) {
        let wait = ctx.rate_limiter().retry_after_secs(&user_id).unwrap_or(60);
        send::send_response(&bot, chat_id, &format!("Too many requests, wait {wait} seconds.")).await;
        log_event(&user_id, "callback_action", started);
        return Ok(());
    }

    let data = query.data.as_deref().unwrap_or("");
    let key = chat_id.0.to_string();

    match data {
        SELECT_ADULT => {
            let _ = ctx.sessions().set_state(&key, &user_id, &ConversationState::AdultWaitingForEvidence);
            send::send_response(&bot, chat_id, ADULT_EVIDENCE_PROMPT).await;
        }
        SELECT_TEENAGER => {
            let _ = ctx.sessions().set_state(&key, &user_id, &ConversationState::TeenagerStopShown);
            bot.send_message(chat_id, TEENAGER_STOP_MESSAGE)
                .reply_markup(keyboard::teenager_ready_keyboard())
                .await?;
        }
        SELECT_GENERAL => {
            send::send_response(&bot, chat_id, GENERAL_PROMPT).await;
        }
        TEENAGER_READY => {
            let conv = ctx.sessions().get_or_default(&key, &user_id).ok();
            if matches!(conv.map(|c| c.state), Some(ConversationState::TeenagerStopShown)) {
                let _ = ctx.sessions().set_state(&key, &user_id, &ConversationState::TeenagerWaitingForPhoto);
                send::send_response(&bot, chat_id, TEENAGER_PHOTO_PROMPT).await;
            }
        }
        other => handle_result_callback(&bot, &ctx, chat_id, &user_id, other).await,
    }

    log_event(&user_id, "callback_action", started);
    Ok(())
}

async fn handle_result_callback<C: TelegramAppContext + 'static>(
    bot: &Bot,
    ctx: &Arc<C>,
    chat_id: ChatId,
    user_id: &str,
    data: &str,
) {
    use forensics_notify::CallbackAction;

    let key = chat_id.0.to_string();

    if data == CallbackAction::BackToMainMenu.data() {
        let _ = ctx.sessions().reset(&key, user_id);
        bot.send_message(chat_id, START_PROMPT).reply_markup(keyboard::scenario_menu()).await.ok();
        return;
    }

    let action = match CallbackAction::from_data(data) {
        Some(a) => a,
        None => return,
    };

    let conversation = match ctx.sessions().get_or_default(&key, user_id) {
        Ok(c) => c,
        Err(_) => return,
    };

    let (analysis_id, scenario) = match conversation.state {
        ConversationState::ReviewingResult { analysis_id, scenario } => (analysis_id, scenario),
        _ => {
            send::send_response(bot, chat_id, "That result is no longer available.").await;
            return;
        }
    };

    let record = match ctx.analyses().get_by_id(&analysis_id) {
        Ok(Some(r)) => r,
        _ => {
            send::send_response(bot, chat_id, "That result is no longer available.").await;
            return;
        }
    };

    let callback_ctx = forensics_notify::CallbackContext {
        analysis_id: &analysis_id,
        image_sha256: &record.image_sha256,
        scenario,
    };
    let rendered = forensics_notify::render_callback(action, &callback_ctx);
    let markup = keyboard::to_markup(&rendered.keyboard);
    send::send_with_keyboard(bot, chat_id, &rendered.body, markup).await;
}

/// Logging middleware — records `(anonymized_user_id, event_kind, latency)`.
/// Never logs raw user ids, image bytes, or text content (spec §4.1).
fn log_event(user_id: &str, event_kind: &str, started: Instant) {
    info!(
        anonymized_user_id = %anonymize_user_id(user_id),
        event_kind,
        latency_ms = started.elapsed().as_millis() as u64,
        "ingress event handled"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_are_non_empty() {
        assert!(!START_PROMPT.is_empty());
        assert!(!ADULT_EVIDENCE_PROMPT.is_empty());
        assert!(!TEENAGER_STOP_MESSAGE.is_empty());
        assert!(TEENAGER_STOP_MESSAGE.contains("not your fault"));
    }
}
