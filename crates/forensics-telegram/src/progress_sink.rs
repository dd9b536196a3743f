//! Telegram implementation of [`forensics_worker::ProgressSink`] (spec §4.7).

use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::warn;

use forensics_worker::{ProgressSink, Stage};

pub struct TelegramProgressSink {
    bot: Bot,
}

impl TelegramProgressSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ProgressSink for TelegramProgressSink {
    async fn edit_stage(&self, chat_id: &str, progress_msg_id: i64, stage: Stage) {
        let chat_id: i64 = match chat_id.parse() {
            Ok(id) => id,
            Err(_) => {
                warn!(chat_id, "progress sink: chat_id is not a valid Telegram chat id");
                return;
            }
        };

        let text = format!("Analysis in progress… ({})", stage.label());
        if let Err(e) = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(progress_msg_id as i32), text)
            .await
        {
            warn!(chat_id, progress_msg_id, stage = stage.label(), error = %e, "progress edit failed, swallowing");
        }
    }
}
