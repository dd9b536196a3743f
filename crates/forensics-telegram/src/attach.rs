//! Inbound image extraction for the Telegram adapter.
//!
//! Downloads Telegram media via `get_file` + `download_file`. Only images
//! matter here (spec §4.2 upload handler); every other attachment type is
//! ignored — this bot analyzes photos, not a general media pipeline.

use teloxide::net::Download;
use teloxide::prelude::*;
use tracing::warn;

/// A downloaded inbound image, ready for the upload handler.
pub struct InboundImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
    /// `true` iff the image arrived via the lossless document channel
    /// rather than Telegram's re-encoded photo channel (spec §4.2 step 6).
    pub preserve_exif: bool,
}

/// Extract the image attached to `msg`, if any.
///
/// Telegram photos are always re-encoded JPEG; documents preserve whatever
/// format the sender uploaded (including EXIF, which Telegram strips from
/// the photo channel) — this is the `preserve_exif` signal spec §4.2
/// ties to priority and analysis `detail_level`.
pub async fn extract_image(bot: &Bot, msg: &Message, max_bytes: u64) -> Option<InboundImage> {
    if let Some(photos) = msg.photo() {
        if let Some(photo) = photos.last() {
            let bytes = download(bot, &photo.file.id, u64::from(photo.file.size), max_bytes).await?;
            return Some(InboundImage {
                bytes,
                extension: "jpg",
                preserve_exif: false,
            });
        }
    }

    if let Some(doc) = msg.document() {
        let mime = doc.mime_type.as_ref().map(|m| m.to_string()).unwrap_or_default();
        if !mime.starts_with("image/") {
            return None;
        }
        let ext = extension_for(mime.strip_prefix("image/"));
        let bytes = download(bot, &doc.file.id, u64::from(doc.file.size), max_bytes).await?;
        return Some(InboundImage {
            bytes,
            extension: ext,
            preserve_exif: true,
        });
    }

    None
}

fn extension_for(subtype: Option<&str>) -> &'static str {
    match subtype {
        Some("png") => "png",
        Some("webp") => "webp",
        Some("heic") | Some("heif") => "heic",
        _ => "jpg",
    }
}

async fn download(bot: &Bot, file_id: &str, reported_size: u64, max_bytes: u64) -> Option<Vec<u8>> {
    if reported_size > max_bytes {
        warn!(file_id, size = reported_size, limit = max_bytes, "Telegram: file exceeds size limit, skipping");
        return None;
    }

    let file = match bot.get_file(file_id).await {
        Ok(f) => f,
        Err(e) => {
            warn!(file_id, error = %e, "Telegram: get_file failed");
            return None;
        }
    };

    if u64::from(file.size) > max_bytes {
        warn!(file_id, size = file.size, limit = max_bytes, "Telegram: file exceeds size limit, skipping");
        return None;
    }

    let mut buf: Vec<u8> = Vec::new();
    if let Err(e) = bot.download_file(&file.path, &mut buf).await {
        warn!(file_id, error = %e, "Telegram: download_file failed");
        return None;
    }

    Some(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_for_known_subtypes() {
        assert_eq!(extension_for(Some("png")), "png");
        assert_eq!(extension_for(Some("webp")), "webp");
        assert_eq!(extension_for(Some("heic")), "heic");
        assert_eq!(extension_for(Some("jpeg")), "jpg");
        assert_eq!(extension_for(None), "jpg");
    }
}
