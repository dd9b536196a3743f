//! Telegram implementation of [`forensics_worker::ResultSink`] (spec §4.4
//! steps 3, 7; §4.7 "replaced by result"). Delivering the result also
//! advances the conversation state to `ReviewingResult` — the worker has no
//! notion of conversation state, so that transition lives here instead.

use std::sync::Arc;

use async_trait::async_trait;
use forensics_notify::RenderedMessage;
use forensics_queue::Job;
use forensics_sessions::ConversationState;
use teloxide::prelude::*;
use tracing::warn;

use forensics_worker::ResultSink;

use crate::context::TelegramAppContext;
use crate::keyboard::to_markup;
use crate::send;

pub struct TelegramResultSink<C: TelegramAppContext + 'static> {
    bot: Bot,
    ctx: Arc<C>,
}

impl<C: TelegramAppContext + 'static> TelegramResultSink<C> {
    pub fn new(bot: Bot, ctx: Arc<C>) -> Self {
        Self { bot, ctx }
    }
}

#[async_trait]
impl<C: TelegramAppContext + 'static> ResultSink for TelegramResultSink<C> {
    async fn deliver_result(&self, job: &Job, analysis_id: &str, rendered: RenderedMessage) {
        let chat_id: i64 = match job.chat_id.parse() {
            Ok(id) => id,
            Err(_) => {
                warn!(chat_id = %job.chat_id, "result sink: chat_id is not a valid Telegram chat id");
                return;
            }
        };

        let keyboard = to_markup(&rendered.keyboard);
        match job.progress_msg_id {
            Some(progress_msg_id) => {
                send::edit_result_with_keyboard(
                    &self.bot,
                    ChatId(chat_id),
                    progress_msg_id,
                    &rendered.body,
                    keyboard,
                )
                .await;
            }
            None => {
                warn!(job_id = %job.id, "result sink: no progress_msg_id recorded, sending result as a new message");
                send::send_with_keyboard(&self.bot, ChatId(chat_id), &rendered.body, keyboard).await;
            }
        }

        // §7 NotificationError: log, no retry via the queue — the state
        // transition still happens so a later callback can find the record.
        if let Err(e) = self.ctx.sessions().set_state(
            &job.chat_id,
            &job.user_id,
            &ConversationState::ReviewingResult {
                analysis_id: analysis_id.to_string(),
                scenario: job.scenario,
            },
        ) {
            warn!(job_id = %job.id, error = %e, "failed to transition conversation to ReviewingResult");
        }
    }

    async fn deliver_transient_failure(&self, job: &Job, message: &str) {
        let chat_id: i64 = match job.chat_id.parse() {
            Ok(id) => id,
            Err(_) => {
                warn!(chat_id = %job.chat_id, "result sink: chat_id is not a valid Telegram chat id");
                return;
            }
        };
        send::send_response(&self.bot, ChatId(chat_id), message).await;

        if let Err(e) = self
            .ctx
            .sessions()
            .set_state(&job.chat_id, &job.user_id, &ConversationState::SelectingScenario)
        {
            warn!(job_id = %job.id, error = %e, "failed to reset conversation after transient failure");
        }
    }
}
