use chrono::DateTime;

/// `DD Mon YYYY, HH:MM`, per §4.6. Falls back to the raw string if it
/// doesn't parse as RFC3339 (the detection API's `capture_timestamp` is
/// tolerated as an opaque string, not a guaranteed format).
pub fn humanize_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.format("%d %b %Y, %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Bare iOS version strings (e.g. `"17.4.1"`) get prefixed `"iOS "`; named
/// software (e.g. `"Adobe Photoshop CS6"`) passes through unchanged.
pub fn normalize_software(raw: &str) -> String {
    let is_bare_version = raw
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.')
        && raw.chars().any(|c| c.is_ascii_digit());
    if is_bare_version {
        format!("iOS {raw}")
    } else {
        raw.to_string()
    }
}

/// `apple iphone 13` -> `Apple iPhone 13`; Canon models get `EOS` uppercased.
/// Alphanumeric model codes (e.g. `SM-G991B`) are left untouched.
pub fn normalize_device(make: Option<&str>, model: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [make, model].into_iter().flatten().collect();
    if parts.is_empty() {
        return None;
    }
    Some(
        parts
            .iter()
            .flat_map(|s| s.split_whitespace())
            .map(normalize_word)
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn normalize_word(word: &str) -> String {
    if !word.chars().all(|c| c.is_ascii_alphabetic()) {
        return word.to_string();
    }
    let lower = word.to_lowercase();
    match lower.as_str() {
        "iphone" => "iPhone".to_string(),
        "ipad" => "iPad".to_string(),
        "eos" => "EOS".to_string(),
        _ => {
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
    }
}

pub fn maps_link(lat: f64, lon: f64) -> String {
    format!("https://www.google.com/maps?q={lat:.5},{lon:.5}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_ios_version_gets_prefixed() {
        assert_eq!(normalize_software("17.4.1"), "iOS 17.4.1");
    }

    #[test]
    fn named_software_passes_through() {
        assert_eq!(
            normalize_software("Adobe Photoshop CS6"),
            "Adobe Photoshop CS6"
        );
    }

    #[test]
    fn apple_iphone_is_properly_cased() {
        assert_eq!(
            normalize_device(Some("apple"), Some("iphone 13")),
            Some("Apple iPhone 13".to_string())
        );
    }

    #[test]
    fn canon_eos_is_uppercased() {
        assert_eq!(
            normalize_device(Some("canon"), Some("eos 5d")),
            Some("Canon EOS 5d".to_string())
        );
    }

    #[test]
    fn model_codes_are_left_untouched() {
        assert_eq!(
            normalize_device(Some("samsung"), Some("SM-G991B")),
            Some("Samsung SM-G991B".to_string())
        );
    }

    #[test]
    fn humanize_falls_back_on_unparseable_input() {
        assert_eq!(humanize_timestamp("not-a-timestamp"), "not-a-timestamp");
    }
}
