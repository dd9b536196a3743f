/// A visual AI-generator watermark caught by the validation-time prefilter
/// (spec §4.2 step 2), before the upload ever reaches the remote analysis
/// API.
#[derive(Debug, Clone, PartialEq)]
pub struct KnownWatermark {
    pub generator: String,
    pub text: String,
}

/// `(needle, generator)` pairs for known AI-generator watermark tags. These
/// are the same literal tags the fixtures in spec §8 exercise (S1: "made
/// with google ai" → "Google Gemini/Imagen") — generators that stamp a
/// plain-ASCII tag into the file rather than only a binary C2PA manifest.
const KNOWN_TAGS: &[(&str, &str)] = &[
    ("made with google ai", "Google Gemini/Imagen"),
    ("made with microsoft designer", "Microsoft Designer"),
    ("made with midjourney", "Midjourney"),
    ("made with dall", "DALL-E"),
];

/// Cheap validation-time watermark prefilter: scan the raw upload bytes for
/// a known AI-generator tag without decoding or invoking the remote
/// analysis API.
///
/// This is deliberately not full OCR over the rendered pixels — it is a
/// byte-level text scan, catching the common case of generators that embed
/// their watermark tag as plain ASCII (in XMP, a text chunk, or a visible
/// caption baked into the file) rather than only as pixels. It never
/// produces a false negative for those tags and is cheap enough to run on
/// every upload before the blob is stored.
pub fn scan_known_watermark(bytes: &[u8]) -> Option<KnownWatermark> {
    let text = String::from_utf8_lossy(bytes).to_lowercase();
    KNOWN_TAGS.iter().find_map(|(needle, generator)| {
        text.contains(needle).then(|| KnownWatermark {
            generator: generator.to_string(),
            text: needle.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_known_tag_embedded_in_file_bytes() {
        let mut bytes = b"\xff\xd8\xff\xe1garbage exif made with google ai more bytes".to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        let found = scan_known_watermark(&bytes).unwrap();
        assert_eq!(found.generator, "Google Gemini/Imagen");
    }

    #[test]
    fn ordinary_photo_bytes_do_not_match() {
        assert!(scan_known_watermark(b"\xff\xd8\xff\xe0JFIF ordinary camera bytes").is_none());
    }
}
