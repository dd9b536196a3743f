use std::time::Duration;

use forensics_core::{Scenario, Verdict};

use crate::format::{humanize_timestamp, maps_link, normalize_device, normalize_software};
use crate::geocode::GeoResolver;
use crate::types::{Button, CallbackAction, Keyboard, RenderInput, RenderedMessage};

const GEOCODE_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_RED_FLAGS: usize = 2;

/// Render the final scenario-shaped message (§4.6). The body is identical
/// in structure across scenarios — only the keyboard and later callback
/// copy vary in tone.
pub async fn render_result(input: &RenderInput, geo: &dyn GeoResolver) -> RenderedMessage {
    let mut body = String::new();

    body.push_str(&header_block(input.verdict, input.confidence));

    if let Some(footprint) = digital_footprint_block(input, geo).await {
        body.push_str("\n\n");
        body.push_str(&footprint);
    }

    if let Some(flags) = red_flags_block(input) {
        body.push_str("\n\n");
        body.push_str(&flags);
    }

    body.push_str("\n\n");
    body.push_str(&format!("<code>{}</code>", input.analysis_id));

    RenderedMessage {
        body,
        keyboard: keyboard_for(input.scenario),
    }
}

fn header_block(verdict: Verdict, confidence: f64) -> String {
    format!(
        "{} <b>{}</b> ({:.0}% confidence)",
        verdict.emoji(),
        verdict.label(),
        confidence * 100.0
    )
}

async fn digital_footprint_block(input: &RenderInput, geo: &dyn GeoResolver) -> Option<String> {
    let metadata = input.metadata.as_ref()?;
    let mut lines = Vec::new();

    if let Some(ts) = &metadata.capture_timestamp {
        lines.push(format!("Captured: {}", humanize_timestamp(ts)));
    }
    if let Some(software) = metadata.software.as_deref().or(metadata.creator_tool.as_deref()) {
        lines.push(format!("Software: {}", normalize_software(software)));
    }
    if let Some(device) = normalize_device(
        metadata.camera_make.as_deref(),
        metadata.camera_model.as_deref(),
    ) {
        lines.push(format!("Device: {device}"));
    }
    if let Some(gps) = &metadata.gps {
        let label = tokio::time::timeout(GEOCODE_TIMEOUT, geo.reverse_geocode(gps.lat, gps.lon))
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| format!("{:.5}, {:.5}", gps.lat, gps.lon));
        lines.push(format!(
            "Location: <a href=\"{}\">{label}</a>",
            maps_link(gps.lat, gps.lon)
        ));
    }

    if lines.is_empty() {
        None
    } else {
        Some(format!("<b>Digital footprint</b>\n{}", lines.join("\n")))
    }
}

fn red_flags_block(input: &RenderInput) -> Option<String> {
    if input.red_flags.is_empty() {
        return None;
    }
    let top: Vec<&str> = input
        .red_flags
        .iter()
        .take(MAX_RED_FLAGS)
        .map(|f| f.label.as_str())
        .collect();
    Some(format!(
        "<b>Red flags</b>\n{}",
        top.iter().map(|l| format!("- {l}")).collect::<Vec<_>>().join("\n")
    ))
}

fn keyboard_for(scenario: Scenario) -> Keyboard {
    match scenario {
        Scenario::AdultBlackmail => Keyboard::default().row(vec![
            Button::new("Get Forensic PDF", CallbackAction::GetForensicPdf),
            Button::new("Counter-measures", CallbackAction::CounterMeasures),
        ]).row(vec![Button::new("Back to Main Menu", CallbackAction::BackToMainMenu)]),

        Scenario::TeenagerSos => Keyboard::default()
            .row(vec![
                Button::new("Get PDF Report", CallbackAction::GetForensicPdf),
                Button::new("How to tell my parents", CallbackAction::ParentHelper),
            ])
            .row(vec![
                Button::new("Stop the Spread", CallbackAction::StopTheSpread),
                Button::new("What is sextortion?", CallbackAction::WhatIsSextortion),
            ])
            .row(vec![Button::new("Back to Main Menu", CallbackAction::BackToMainMenu)]),

        Scenario::General => Keyboard::default()
            .row(vec![
                Button::new("What is AI-generated content?", CallbackAction::WhatIsAiGenerated),
                Button::new("How to spot fake images", CallbackAction::HowToSpotFakeImages),
            ])
            .row(vec![Button::new("Share Result", CallbackAction::ShareResult)])
            .row(vec![Button::new("Back to Main Menu", CallbackAction::BackToMainMenu)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::NoopGeoResolver;
    use forensics_detection::ExtractedMetadata;

    fn input(scenario: Scenario) -> RenderInput {
        RenderInput {
            analysis_id: "ANL-20260101-deadbeef".to_string(),
            verdict: Verdict::AiGenerated,
            confidence: 0.97,
            reason: "visual AI-generator watermark detected (Google Gemini/Imagen)".to_string(),
            scenario,
            metadata: None,
            image_sha256: "abc123".to_string(),
            processing_time_ms: 1200,
            red_flags: Vec::new(),
        }
    }

    #[tokio::test]
    async fn s1_general_keyboard_has_ai_explainer_not_counter_measures() {
        let out = render_result(&input(Scenario::General), &NoopGeoResolver).await;
        let labels: Vec<&str> = out
            .keyboard
            .rows
            .iter()
            .flatten()
            .map(|b| b.label.as_str())
            .collect();
        assert!(labels.contains(&"What is AI-generated content?"));
        assert!(!labels.contains(&"Counter-measures"));
    }

    #[tokio::test]
    async fn adult_keyboard_is_adult_variant() {
        let out = render_result(&input(Scenario::AdultBlackmail), &NoopGeoResolver).await;
        let labels: Vec<&str> = out
            .keyboard
            .rows
            .iter()
            .flatten()
            .map(|b| b.label.as_str())
            .collect();
        assert!(labels.contains(&"Counter-measures"));
        assert!(labels.contains(&"Get Forensic PDF"));
    }

    #[tokio::test]
    async fn body_footer_carries_analysis_id() {
        let out = render_result(&input(Scenario::General), &NoopGeoResolver).await;
        assert!(out.body.contains("ANL-20260101-deadbeef"));
    }

    #[tokio::test]
    async fn missing_metadata_omits_footprint_block() {
        let out = render_result(&input(Scenario::General), &NoopGeoResolver).await;
        assert!(!out.body.contains("Digital footprint"));
    }

    #[tokio::test]
    async fn gps_falls_back_to_coordinates_when_resolver_returns_none() {
        let mut inp = input(Scenario::General);
        inp.metadata = Some(ExtractedMetadata {
            gps: Some(forensics_detection::GpsCoords {
                lat: 37.33,
                lon: -122.03,
                alt: None,
            }),
            ..Default::default()
        });
        let out = render_result(&inp, &NoopGeoResolver).await;
        assert!(out.body.contains("37.33"));
    }
}
