//! Message sending helpers for the Telegram adapter.
//!
//! Telegram's message limit is 4096 characters; 4090 leaves headroom for
//! chunk numbering. The renderer (`forensics-notify`) emits HTML, not
//! Markdown — bodies carry `<b>`/`<code>`/`<a href>` tags directly, so
//! unlike a free-form chat bot there is no user text to escape here.

use std::time::Duration;

use teloxide::payloads::{EditMessageTextSetters, SendMessageSetters};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, ParseMode};
use tracing::warn;

/// Maximum characters per Telegram message (limit is 4096; we use 4090 for safety).
const CHUNK_MAX: usize = 4090;

/// Code-fence-aware message splitter for Telegram. The renderer's output
/// has no fenced code blocks, but the splitter is kept fence-aware since a
/// red-flag or metadata line could legitimately contain backticks.
pub fn split_chunks_smart(text: &str) -> Vec<String> {
    if text.len() <= CHUNK_MAX {
        return vec![text.to_string()];
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in &lines {
        let cost = if current.is_empty() { line.len() } else { 1 + line.len() };
        if !current.is_empty() && current.len() + cost > CHUNK_MAX {
            chunks.push(current);
            current = String::new();
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    let mut result = Vec::new();
    for chunk in chunks {
        if chunk.len() <= CHUNK_MAX {
            result.push(chunk);
        } else {
            let mut remaining = chunk.as_str();
            while remaining.len() > CHUNK_MAX {
                // CHUNK_MAX may land inside a multi-byte UTF-8 character;
                // back off to the nearest preceding char boundary first.
                let mut boundary = CHUNK_MAX;
                while !remaining.is_char_boundary(boundary) {
                    boundary -= 1;
                }
                let split_at = remaining[..boundary]
                    .rfind('\n')
                    .or_else(|| remaining[..boundary].rfind(' '))
                    .unwrap_or(boundary);
                result.push(remaining[..split_at].to_string());
                remaining = remaining[split_at..].trim_start();
            }
            if !remaining.is_empty() {
                result.push(remaining.to_string());
            }
        }
    }

    result
}

/// Strip HTML tags for the plain-text fallback used when Telegram rejects
/// the HTML parse mode (malformed renderer output, extremely unlikely but
/// not worth crashing the chat over).
fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Send `text` as HTML to `chat_id`, chunked, with no follow-up keyboard.
pub async fn send_response(bot: &Bot, chat_id: ChatId, text: &str) {
    send_chunks(bot, chat_id, text, None).await;
}

/// Send `text` as HTML to `chat_id`, chunked, attaching `keyboard` to the
/// final chunk only (Telegram inline keyboards live on one message).
pub async fn send_with_keyboard(bot: &Bot, chat_id: ChatId, text: &str, keyboard: InlineKeyboardMarkup) {
    send_chunks(bot, chat_id, text, Some(keyboard)).await;
}

/// Replace the captured progress message with the final rendered result in
/// place (spec §4.7: "single progress message ... replaced by the final
/// rendered result"). When the body overflows one Telegram message, the
/// first chunk replaces the progress message and any remaining chunks
/// follow as new messages, keyboard attached to the last one. Falls back
/// to sending the whole result as new messages if the edit itself fails
/// (the progress message was deleted, or is too old to edit).
pub async fn edit_result_with_keyboard(
    bot: &Bot,
    chat_id: ChatId,
    progress_msg_id: i64,
    text: &str,
    keyboard: InlineKeyboardMarkup,
) {
    let chunks = split_chunks_smart(text);
    let last = chunks.len().saturating_sub(1);

    let mut edit = bot
        .edit_message_text(chat_id, MessageId(progress_msg_id as i32), chunks[0].clone())
        .parse_mode(ParseMode::Html);
    if last == 0 {
        edit = edit.reply_markup(keyboard.clone());
    }

    if let Err(e) = edit.await {
        warn!(error = %e, chat_id = chat_id.0, progress_msg_id, "failed to edit progress message with result, sending as a new message instead");
        send_chunk_list(bot, chat_id, &chunks, Some(keyboard)).await;
        return;
    }

    if last > 0 {
        send_chunk_list(bot, chat_id, &chunks[1..], Some(keyboard)).await;
    }
}

async fn send_chunks(bot: &Bot, chat_id: ChatId, text: &str, keyboard: Option<InlineKeyboardMarkup>) {
    let chunks = split_chunks_smart(text);
    send_chunk_list(bot, chat_id, &chunks, keyboard).await;
}

async fn send_chunk_list(bot: &Bot, chat_id: ChatId, chunks: &[String], keyboard: Option<InlineKeyboardMarkup>) {
    let last = chunks.len().saturating_sub(1);

    for (i, chunk) in chunks.iter().enumerate() {
        let mut request = bot.send_message(chat_id, chunk).parse_mode(ParseMode::Html);
        if i == last {
            if let Some(kb) = keyboard.clone() {
                request = request.reply_markup(kb);
            }
        }
        let sent = request.await;

        if sent.is_err() {
            let plain = strip_tags(chunk);
            let mut fallback = bot.send_message(chat_id, &plain);
            if i == last {
                if let Some(kb) = keyboard.clone() {
                    fallback = fallback.reply_markup(kb);
                }
            }
            if let Err(e) = fallback.await {
                warn!(error = %e, chunk_index = i, "Telegram: failed to send plain-text fallback");
            }
        }

        if i != last {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split_chunks_smart("Hello, world!");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "Hello, world!");
    }

    #[test]
    fn exactly_chunk_max_is_single_chunk() {
        let text = "a".repeat(CHUNK_MAX);
        let chunks = split_chunks_smart(&text);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn over_limit_splits_on_newline() {
        let line = "a".repeat(2000);
        let text = format!("{line}\n{line}\n{line}");
        let chunks = split_chunks_smart(&text);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.len() <= CHUNK_MAX, "chunk too large: {}", c.len());
        }
    }

    #[test]
    fn very_long_single_line_force_splits() {
        let text = "x".repeat(9000);
        let chunks = split_chunks_smart(&text);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.len() <= CHUNK_MAX);
        }
    }

    #[test]
    fn force_split_does_not_panic_on_multibyte_boundary() {
        // "é" is 2 bytes; repeating it lands CHUNK_MAX mid-character for most
        // repeat counts unless the splitter backs off to a char boundary.
        let text = "é".repeat(5000);
        let chunks = split_chunks_smart(&text);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.len() <= CHUNK_MAX);
            assert!(std::str::from_utf8(c.as_bytes()).is_ok());
        }
    }

    #[test]
    fn strip_tags_removes_markup_only() {
        let html = "<b>Bold</b> and <code>code</code>";
        assert_eq!(strip_tags(html), "Bold and code");
    }
}
