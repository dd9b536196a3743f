//! Verdict fusion (§4.5) — the core's decision logic, isolated as a pure
//! function over a [`DetectorSignals`] bundle so it can be exercised without
//! a network call. Given the same bundle the result is byte-identical
//! across runs (§8 property 7).

use forensics_core::Verdict;

use crate::types::{DetectorSignals, ExtractedMetadata};

/// Output of [`fuse`]: a verdict, its confidence in `[0,1]`, and a
/// human-readable (non-technical) reason.
#[derive(Debug, Clone, PartialEq)]
pub struct VerdictOutcome {
    pub verdict: Verdict,
    pub confidence: f64,
    pub reason: String,
}

/// Priority cascade, first match wins. See spec §4.5 for the authoritative
/// table; this function reproduces it verbatim.
pub fn fuse(signals: &DetectorSignals) -> VerdictOutcome {
    if let Some(wm) = &signals.visual_watermark {
        return VerdictOutcome {
            verdict: Verdict::AiGenerated,
            confidence: 0.98,
            reason: format!("visual AI-generator watermark detected ({})", wm.generator),
        };
    }

    if signals.c2pa_watermark {
        return VerdictOutcome {
            verdict: Verdict::AiGenerated,
            confidence: 0.95,
            reason: "C2PA provenance manifest present".to_string(),
        };
    }

    if signals.ai_software_in_exif {
        return VerdictOutcome {
            verdict: Verdict::AiGenerated,
            confidence: 0.98,
            reason: "AI-generation software signature found in EXIF".to_string(),
        };
    }

    if signals.screenshot_detected {
        return VerdictOutcome {
            verdict: Verdict::Manipulated,
            confidence: 0.95,
            reason: "screenshot detected with high confidence".to_string(),
        };
    }

    if signals.metadata_risk >= 80.0 {
        let verdict = if signals.metadata_risk >= 90.0 {
            Verdict::AiGenerated
        } else {
            Verdict::Manipulated
        };
        let confidence = (signals.metadata_risk / 100.0).min(0.98);
        return VerdictOutcome {
            verdict,
            confidence,
            reason: format!(
                "metadata fraud score {:.0} exceeds the high-risk threshold",
                signals.metadata_risk
            ),
        };
    }

    let face_term = if signals.face_detected {
        0.10 * signals.face_swap_score
    } else {
        0.0
    };
    let mut combined = 0.35 * signals.ai_heuristic
        + 0.30 * signals.fft_score
        + 0.25 * (signals.metadata_risk / 100.0)
        + face_term;

    combined -= trusted_software_reduction(&signals.metadata);
    combined -= camera_authenticity_reduction(&signals.metadata);
    combined = combined.max(0.0);

    let has_camera_info =
        signals.metadata.camera_make.is_some() || signals.metadata.camera_model.is_some();
    if signals.metadata_risk < 40.0 && has_camera_info {
        let bonus = (40.0 - signals.metadata_risk) / 100.0;
        if bonus > 0.0 && (0.35..0.50).contains(&combined) {
            let confidence = (1.0 - combined + bonus).max(0.70);
            return VerdictOutcome {
                verdict: Verdict::Real,
                confidence,
                reason: "consistent camera metadata outweighs a borderline signal".to_string(),
            };
        }
    }

    if combined >= 0.70 {
        VerdictOutcome {
            verdict: Verdict::AiGenerated,
            confidence: combined.min(0.95),
            reason: "combined detector signal strongly indicates AI generation".to_string(),
        }
    } else if combined >= 0.50 {
        let verdict = if signals.ai_heuristic >= signals.fft_score {
            Verdict::AiGenerated
        } else {
            Verdict::Manipulated
        };
        VerdictOutcome {
            verdict,
            confidence: combined,
            reason: "moderate combined detector signal".to_string(),
        }
    } else if combined >= 0.35 {
        VerdictOutcome {
            verdict: Verdict::Inconclusive,
            confidence: 1.0 - combined,
            reason: "detector signals do not clearly agree".to_string(),
        }
    } else {
        let confidence = (1.0 - combined).clamp(0.70, 0.95);
        VerdictOutcome {
            verdict: Verdict::Real,
            confidence,
            reason: "no significant AI-generation or manipulation signal detected".to_string(),
        }
    }
}

/// Lightroom/Capture One → strong (0.30); Photoshop alone → medium (0.15).
fn trusted_software_reduction(metadata: &ExtractedMetadata) -> f64 {
    let text = format!(
        "{} {}",
        metadata.software.as_deref().unwrap_or(""),
        metadata.creator_tool.as_deref().unwrap_or("")
    )
    .to_lowercase();

    if text.contains("lightroom") || text.contains("capture one") {
        0.30
    } else if text.contains("photoshop") {
        0.15
    } else {
        0.0
    }
}

/// Both device + lens serial present → 0.30; either alone → 0.20.
fn camera_authenticity_reduction(metadata: &ExtractedMetadata) -> f64 {
    match (
        metadata.device_serial.is_some(),
        metadata.lens_serial.is_some(),
    ) {
        (true, true) => 0.30,
        (true, false) | (false, true) => 0.20,
        (false, false) => 0.0,
    }
}

/// A candidate entry for the notification renderer's "red flags" block
/// (§4.6) — the renderer keeps at most the top two by `severity`.
#[derive(Debug, Clone, PartialEq)]
pub struct RedFlagCandidate {
    pub label: String,
    /// `0..1`, higher = more concerning. Used only to rank candidates.
    pub severity: f64,
}

/// Derive ranked red-flag candidates from a signal bundle. Pure and
/// deterministic, same as [`fuse`] — the renderer does not reinterpret
/// detector scores itself, it only picks the top two.
pub fn red_flag_candidates(signals: &DetectorSignals) -> Vec<RedFlagCandidate> {
    let mut flags = Vec::new();

    if signals.ai_heuristic >= 0.5 {
        flags.push(RedFlagCandidate {
            label: "AI pattern strength".to_string(),
            severity: signals.ai_heuristic,
        });
    }
    if signals.metadata_risk >= 50.0 {
        flags.push(RedFlagCandidate {
            label: "metadata score".to_string(),
            severity: signals.metadata_risk / 100.0,
        });
    }
    if signals.visual_watermark.is_some() {
        flags.push(RedFlagCandidate {
            label: "visual watermark".to_string(),
            severity: 1.0,
        });
    }
    if signals.ai_software_in_exif {
        flags.push(RedFlagCandidate {
            label: "software detected".to_string(),
            severity: 0.9,
        });
    }
    let modern_device =
        signals.metadata.camera_make.is_some() || signals.metadata.camera_model.is_some();
    if modern_device && signals.metadata.gps.is_none() {
        flags.push(RedFlagCandidate {
            label: "missing GPS on modern device".to_string(),
            severity: 0.4,
        });
    }
    if modern_device && signals.metadata.capture_timestamp.is_none() {
        flags.push(RedFlagCandidate {
            label: "missing timestamps".to_string(),
            severity: 0.3,
        });
    }
    if signals.fft_score >= 0.5 {
        flags.push(RedFlagCandidate {
            label: "frequency anomalies".to_string(),
            severity: signals.fft_score,
        });
    }
    if signals.face_detected && signals.face_swap_score >= 0.5 {
        flags.push(RedFlagCandidate {
            label: "face integrity issues".to_string(),
            severity: signals.face_swap_score,
        });
    }

    flags.sort_by(|a, b| {
        b.severity
            .partial_cmp(&a.severity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VisualWatermark;

    fn baseline() -> DetectorSignals {
        DetectorSignals {
            ai_heuristic: 0.0,
            fft_score: 0.0,
            metadata_risk: 0.0,
            face_swap_score: 0.0,
            face_detected: false,
            visual_watermark: None,
            c2pa_watermark: false,
            ai_software_in_exif: false,
            screenshot_detected: false,
            red_flags: Vec::new(),
            metadata: ExtractedMetadata::default(),
        }
    }

    /// S1 — Gemini AI image, general scenario.
    #[test]
    fn s1_gemini_watermark_short_circuits_to_ai_generated() {
        let mut s = baseline();
        s.visual_watermark = Some(VisualWatermark {
            generator: "Google Gemini/Imagen".to_string(),
            text: "made with google ai".to_string(),
            location: "bottom_right".to_string(),
            confidence: 0.90,
        });
        // other signals arbitrary
        s.ai_heuristic = 0.5;
        s.fft_score = 0.5;

        let out = fuse(&s);
        assert_eq!(out.verdict, Verdict::AiGenerated);
        assert!(out.confidence >= 0.95);
        assert!(out.reason.contains("Google"));
    }

    /// S2 — Canon DSLR JPEG edited in Lightroom, adult scenario.
    #[test]
    fn s2_trusted_software_and_camera_serials_yield_real() {
        let mut s = baseline();
        s.metadata_risk = 55.0;
        s.ai_heuristic = 0.15;
        s.fft_score = 0.25;
        s.metadata.software = Some("Adobe Photoshop CS6".to_string());
        s.metadata.creator_tool = Some("Adobe Photoshop Lightroom 5.3".to_string());
        s.metadata.device_serial = Some("DEV123".to_string());
        s.metadata.lens_serial = Some("LENS456".to_string());

        let out = fuse(&s);
        assert_eq!(out.verdict, Verdict::Real);
        assert!(out.confidence >= 0.70);
    }

    /// S3 — Samsung Galaxy S21 photo containing text, no scenario selected.
    #[test]
    fn s3_good_metadata_bonus_escalates_borderline_to_real() {
        let mut s = baseline();
        s.ai_heuristic = 0.39;
        s.fft_score = 0.63;
        s.metadata_risk = 30.0;
        s.metadata.camera_make = Some("samsung".to_string());
        s.metadata.camera_model = Some("SM-G991B".to_string());

        let out = fuse(&s);
        assert_eq!(out.verdict, Verdict::Real);
        assert!(out.confidence >= 0.70);
    }

    #[test]
    fn c2pa_watermark_short_circuits() {
        let mut s = baseline();
        s.c2pa_watermark = true;
        let out = fuse(&s);
        assert_eq!(out.verdict, Verdict::AiGenerated);
        assert!((out.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn ai_software_in_exif_short_circuits() {
        let mut s = baseline();
        s.ai_software_in_exif = true;
        let out = fuse(&s);
        assert_eq!(out.verdict, Verdict::AiGenerated);
        assert!((out.confidence - 0.98).abs() < 1e-9);
    }

    #[test]
    fn screenshot_detected_short_circuits_to_manipulated() {
        let mut s = baseline();
        s.screenshot_detected = true;
        let out = fuse(&s);
        assert_eq!(out.verdict, Verdict::Manipulated);
        assert!((out.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn high_metadata_risk_above_90_is_ai_generated() {
        let mut s = baseline();
        s.metadata_risk = 95.0;
        let out = fuse(&s);
        assert_eq!(out.verdict, Verdict::AiGenerated);
    }

    #[test]
    fn high_metadata_risk_between_80_and_90_is_manipulated() {
        let mut s = baseline();
        s.metadata_risk = 85.0;
        let out = fuse(&s);
        assert_eq!(out.verdict, Verdict::Manipulated);
    }

    #[test]
    fn pure_function_is_deterministic() {
        let mut s = baseline();
        s.ai_heuristic = 0.6;
        s.fft_score = 0.4;
        s.metadata_risk = 20.0;
        let a = fuse(&s);
        let b = fuse(&s);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_signal_bundle_is_real_with_clamped_confidence() {
        let s = baseline();
        let out = fuse(&s);
        assert_eq!(out.verdict, Verdict::Real);
        assert!(out.confidence >= 0.70 && out.confidence <= 0.95);
    }

    #[test]
    fn red_flags_are_ranked_and_capped_by_caller() {
        let mut s = baseline();
        s.ai_heuristic = 0.8;
        s.metadata_risk = 60.0;
        s.fft_score = 0.55;

        let flags = red_flag_candidates(&s);
        assert!(flags.len() >= 3);
        assert!(flags[0].severity >= flags[1].severity);
        assert!(flags[1].severity >= flags[2].severity);
    }

    #[test]
    fn no_flags_when_all_signals_benign() {
        let s = baseline();
        assert!(red_flag_candidates(&s).is_empty());
    }
}
