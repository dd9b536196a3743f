use forensics_core::{Scenario, Verdict};
use forensics_detection::{ExtractedMetadata, RedFlagCandidate};

/// Everything the renderer needs to produce a final message (§4.6 inputs),
/// plus the ranked red-flag candidates the worker derived from the signal
/// bundle (the renderer only ever picks the top two).
#[derive(Debug, Clone)]
pub struct RenderInput {
    pub analysis_id: String,
    pub verdict: Verdict,
    pub confidence: f64,
    pub reason: String,
    pub scenario: Scenario,
    pub metadata: Option<ExtractedMetadata>,
    pub image_sha256: String,
    pub processing_time_ms: u64,
    pub red_flags: Vec<RedFlagCandidate>,
}

/// Follow-up actions serviced by C5 (§4.6 "Callback actions"). The variant
/// names double as stable `callback_data` identifiers via [`Self::data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackAction {
    GetForensicPdf,
    CounterMeasures,
    ParentHelper,
    StopTheSpread,
    WhatIsSextortion,
    WhatIsAiGenerated,
    HowToSpotFakeImages,
    ShareResult,
    BackToMainMenu,
}

impl CallbackAction {
    /// Stable wire identifier stored in the keyboard's callback_data.
    pub fn data(&self) -> &'static str {
        match self {
            CallbackAction::GetForensicPdf => "pdf_request",
            CallbackAction::CounterMeasures => "counter_measures",
            CallbackAction::ParentHelper => "parent_helper",
            CallbackAction::StopTheSpread => "stop_the_spread",
            CallbackAction::WhatIsSextortion => "what_is_sextortion",
            CallbackAction::WhatIsAiGenerated => "what_is_ai_generated",
            CallbackAction::HowToSpotFakeImages => "how_to_spot_fakes",
            CallbackAction::ShareResult => "share_result",
            CallbackAction::BackToMainMenu => "back_to_menu",
        }
    }

    pub fn from_data(s: &str) -> Option<Self> {
        Some(match s {
            "pdf_request" => CallbackAction::GetForensicPdf,
            "counter_measures" => CallbackAction::CounterMeasures,
            "parent_helper" => CallbackAction::ParentHelper,
            "stop_the_spread" => CallbackAction::StopTheSpread,
            "what_is_sextortion" => CallbackAction::WhatIsSextortion,
            "what_is_ai_generated" => CallbackAction::WhatIsAiGenerated,
            "how_to_spot_fakes" => CallbackAction::HowToSpotFakeImages,
            "share_result" => CallbackAction::ShareResult,
            "back_to_menu" => CallbackAction::BackToMainMenu,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Button {
    pub label: String,
    pub action: CallbackAction,
}

impl Button {
    pub fn new(label: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// An inline keyboard, one row per `Vec<Button>`.
#[derive(Debug, Clone, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        self.rows.push(buttons);
        self
    }
}

#[derive(Debug, Clone)]
pub struct RenderedMessage {
    pub body: String,
    pub keyboard: Keyboard,
}
