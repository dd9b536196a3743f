use serde::Deserialize;

/// Detail level requested from the analysis API (§4.4 step 3).
///
/// `detailed` is requested when the upload arrived on a lossless channel
/// (`preserve_exif = true`); `basic` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLevel {
    Basic,
    Detailed,
}

impl DetailLevel {
    pub fn for_preserve_exif(preserve_exif: bool) -> Self {
        if preserve_exif {
            DetailLevel::Detailed
        } else {
            DetailLevel::Basic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Basic => "basic",
            DetailLevel::Detailed => "detailed",
        }
    }
}

/// Request parameters sent alongside the image bytes.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest {
    pub detail_level: DetailLevel,
    pub preserve_exif: bool,
}

impl AnalysisRequest {
    pub fn new(preserve_exif: bool) -> Self {
        Self {
            detail_level: DetailLevel::for_preserve_exif(preserve_exif),
            preserve_exif,
        }
    }
}

/// A detected visual AI-generator watermark (OCR probe, §4.5 cascade step 1).
#[derive(Debug, Clone, Deserialize)]
pub struct VisualWatermark {
    pub generator: String,
    pub text: String,
    pub location: String,
    pub confidence: f64,
}

/// GPS coordinates extracted from EXIF, if present.
#[derive(Debug, Clone, Deserialize)]
pub struct GpsCoords {
    pub lat: f64,
    pub lon: f64,
    pub alt: Option<f64>,
}

/// Metadata extracted by the detection API, consumed by the notification
/// renderer's "digital footprint" block (§4.6). Every field is optional —
/// the core must tolerate any subset being absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractedMetadata {
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub software: Option<String>,
    pub creator_tool: Option<String>,
    pub capture_timestamp: Option<String>,
    pub gps: Option<GpsCoords>,
    pub exif_field_count: Option<u32>,
    /// Camera body serial. Not in the published API shape but tolerated as
    /// an extra `details` key (§4.5 camera-authenticity bonus, S2 fixture).
    #[serde(default)]
    pub device_serial: Option<String>,
    /// Lens serial, same provenance as `device_serial`.
    #[serde(default)]
    pub lens_serial: Option<String>,
}

/// A red flag surfaced by the detection API, rendered in the notification's
/// "red flags" block (§4.6) — at most the top two are shown.
#[derive(Debug, Clone, Deserialize)]
pub struct RedFlag {
    pub reason: String,
    pub severity: f64,
    pub trust_level: Option<String>,
}

/// The detector-signal bundle the core fuses into a verdict (§3, §4.5).
/// Consumed, never owned — the pure [`crate::fusion::fuse`] function is the
/// only thing that interprets it.
#[derive(Debug, Clone)]
pub struct DetectorSignals {
    pub ai_heuristic: f64,
    pub fft_score: f64,
    /// `0..=100`, higher = more suspicious.
    pub metadata_risk: f64,
    pub face_swap_score: f64,
    pub face_detected: bool,
    pub visual_watermark: Option<VisualWatermark>,
    pub c2pa_watermark: bool,
    pub ai_software_in_exif: bool,
    pub screenshot_detected: bool,
    pub red_flags: Vec<RedFlag>,
    pub metadata: ExtractedMetadata,
}

/// Raw wire shape of a successful analysis API response (§6). Field names
/// match the API's JSON exactly; unknown extra keys are ignored by serde's
/// default behaviour, satisfying "must never fail the pipeline on unknown
/// extra keys."
#[derive(Debug, Clone, Deserialize)]
pub struct RawAnalysisResponse {
    #[allow(dead_code)]
    pub verdict: Option<String>,
    #[allow(dead_code)]
    pub confidence: Option<f64>,
    #[allow(dead_code)]
    pub verdict_reason: Option<String>,
    #[serde(default)]
    pub watermark_detected: bool,
    #[serde(default)]
    pub watermark_analysis: Option<String>,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub details: RawDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDetails {
    #[serde(default)]
    pub ai_detection_score: f64,
    #[serde(default)]
    pub fft_score: f64,
    #[serde(default)]
    pub metadata_fraud_score: f64,
    #[serde(default)]
    pub face_swap_score: f64,
    #[serde(default)]
    pub face_detected: bool,
    #[serde(default)]
    pub red_flags: Vec<RedFlag>,
    #[serde(default)]
    pub camera_make: Option<String>,
    #[serde(default)]
    pub camera_model: Option<String>,
    #[serde(default)]
    pub software: Option<String>,
    #[serde(default)]
    pub creator_tool: Option<String>,
    #[serde(default)]
    pub capture_timestamp: Option<String>,
    #[serde(default)]
    pub gps: Option<GpsCoords>,
    #[serde(default)]
    pub exif_field_count: Option<u32>,
    #[serde(default)]
    pub screenshot_detected: bool,
    #[serde(default)]
    pub c2pa_present: bool,
    #[serde(default)]
    pub ai_software_in_exif: bool,
    #[serde(default)]
    pub visual_watermark: Option<VisualWatermark>,
    #[serde(default)]
    pub device_serial: Option<String>,
    #[serde(default)]
    pub lens_serial: Option<String>,
}

/// Result of a successful analysis call: the signal bundle plus API-reported
/// processing time, ready for [`crate::fusion::fuse`].
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub signals: DetectorSignals,
    pub processing_time_ms: u64,
}

impl RawAnalysisResponse {
    pub fn into_outcome(self) -> AnalysisOutcome {
        let d = self.details;
        let visual_watermark = d.visual_watermark.or_else(|| {
            // tolerate providers reporting watermark at the top level only
            if self.watermark_detected {
                self.watermark_analysis.map(|text| VisualWatermark {
                    generator: "unknown".to_string(),
                    text,
                    location: "unknown".to_string(),
                    confidence: 0.9,
                })
            } else {
                None
            }
        });

        AnalysisOutcome {
            signals: DetectorSignals {
                ai_heuristic: d.ai_detection_score,
                fft_score: d.fft_score,
                metadata_risk: d.metadata_fraud_score,
                face_swap_score: d.face_swap_score,
                face_detected: d.face_detected,
                visual_watermark,
                c2pa_watermark: d.c2pa_present,
                ai_software_in_exif: d.ai_software_in_exif,
                screenshot_detected: d.screenshot_detected,
                red_flags: d.red_flags,
                metadata: ExtractedMetadata {
                    camera_make: d.camera_make,
                    camera_model: d.camera_model,
                    software: d.software,
                    creator_tool: d.creator_tool,
                    capture_timestamp: d.capture_timestamp,
                    gps: d.gps,
                    exif_field_count: d.exif_field_count,
                    device_serial: d.device_serial,
                    lens_serial: d.lens_serial,
                },
            },
            processing_time_ms: self.processing_time_ms,
        }
    }
}
