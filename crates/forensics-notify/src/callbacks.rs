//! Follow-up callback handlers (§4.6 "Callback actions"). Each scenario's
//! copy conforms to a fixed register (§4.6 tone policy): adult =
//! clinical/legal, teenager = reassuring and age-appropriate, general =
//! educational/neutral. Canonical substrings below are what §8's tone
//! tests check for.

use forensics_core::Scenario;

use crate::types::{Button, CallbackAction, Keyboard, RenderedMessage};

/// Minimal context a callback handler needs to personalise its copy.
pub struct CallbackContext<'a> {
    pub analysis_id: &'a str,
    pub image_sha256: &'a str,
    pub scenario: Scenario,
}

fn back_to_menu_row() -> Keyboard {
    Keyboard::default().row(vec![Button::new("Back to Main Menu", CallbackAction::BackToMainMenu)])
}

/// Dispatch a callback action to its rendered reply. `BackToMainMenu`
/// itself carries no body here — the session layer resets state and
/// re-shows scenario selection (§4.2); this function is not called for it.
pub fn render_callback(action: CallbackAction, ctx: &CallbackContext<'_>) -> RenderedMessage {
    let body = match action {
        CallbackAction::CounterMeasures => counter_measures_body(ctx),
        CallbackAction::ParentHelper => parent_helper_body(),
        CallbackAction::StopTheSpread => stop_the_spread_body(),
        CallbackAction::WhatIsSextortion => what_is_sextortion_body(),
        CallbackAction::WhatIsAiGenerated => what_is_ai_generated_body(),
        CallbackAction::HowToSpotFakeImages => how_to_spot_fakes_body(),
        CallbackAction::ShareResult => share_result_body(ctx),
        CallbackAction::GetForensicPdf => pdf_request_body(ctx),
        CallbackAction::BackToMainMenu => String::new(),
    };

    RenderedMessage {
        body,
        keyboard: back_to_menu_row(),
    }
}

/// Adult scenario — clinical/legal register.
fn counter_measures_body(ctx: &CallbackContext<'_>) -> String {
    format!(
        "<b>Documented evidentiary record</b>\n\
         This analysis (<code>{analysis_id}</code>, image hash <code>{hash}</code>) can support a \
         formal report. Recommended steps: preserve the original file and all communications \
         unaltered, do not engage further with the sender, and file a report with StopNCII.org \
         (for image removal assistance) and the FBI Internet Crime Complaint Center (IC3.gov) \
         if extortion is involved.\n\
         https://stopncii.org\nhttps://www.ic3.gov",
        analysis_id = ctx.analysis_id,
        hash = ctx.image_sha256,
    )
}

/// Teenager scenario — reassuring, age-appropriate register.
fn parent_helper_body() -> String {
    "<b>Telling a parent or trusted adult</b>\n\
     This is not your fault, and you are not in trouble. Choose a calm moment, show them this \
     result, and let them know what happened step by step. If it feels easier, you can also \
     show this conversation to them directly — it already has the evidence gathered for you."
        .to_string()
}

fn stop_the_spread_body() -> String {
    "<b>Stopping the spread</b>\n\
     You are not alone, and there are people who can help remove this content. NCMEC's Take It \
     Down service can help get images taken down from participating platforms, and it does not \
     require you to share the image itself. Visit TakeItDown.NCMEC.org for a confidential, \
     free walkthrough."
        .to_string()
}

fn what_is_sextortion_body() -> String {
    "<b>What is sextortion?</b>\n\
     Sextortion is when someone threatens to share a real or fake intimate image unless you pay \
     them or do what they ask. It is a crime, not your fault, and reporting it is the safest \
     next step — the threats stop being useful to them once you stop engaging and tell a \
     trusted adult."
        .to_string()
}

/// General scenario — educational/neutral register.
fn what_is_ai_generated_body() -> String {
    "<b>What is AI-generated content?</b>\n\
     AI-generated images are created or substantially altered by generative models rather than \
     captured by a camera. Common tells include inconsistent lighting, warped text, missing \
     camera metadata, and embedded provenance markers that this bot checks for automatically."
        .to_string()
}

fn how_to_spot_fakes_body() -> String {
    "<b>How to spot fake images</b>\n\
     Look for mismatched shadows, distorted hands or text, unnatural skin texture, and metadata \
     that has been stripped or edited. No single signal is conclusive on its own — that's why \
     this bot combines several independent checks before reaching a verdict."
        .to_string()
}

fn share_result_body(ctx: &CallbackContext<'_>) -> String {
    format!(
        "Share this analysis: <code>{}</code>",
        ctx.analysis_id
    )
}

fn pdf_request_body(ctx: &CallbackContext<'_>) -> String {
    format!(
        "Your forensic PDF report for <code>{}</code> is being prepared and will be delivered \
         shortly.",
        ctx.analysis_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(scenario: Scenario) -> CallbackContext<'static> {
        CallbackContext {
            analysis_id: "ANL-20260101-deadbeef",
            image_sha256: "abc123",
            scenario,
        }
    }

    #[test]
    fn teenager_parent_helper_is_reassuring() {
        let out = render_callback(CallbackAction::ParentHelper, &ctx(Scenario::TeenagerSos));
        assert!(out.body.contains("not your fault"));
    }

    #[test]
    fn teenager_sextortion_explainer_names_it_a_crime() {
        let out = render_callback(CallbackAction::WhatIsSextortion, &ctx(Scenario::TeenagerSos));
        assert!(out.body.contains("not your fault"));
    }

    #[test]
    fn adult_counter_measures_is_clinical_and_cites_identifiers() {
        let out = render_callback(CallbackAction::CounterMeasures, &ctx(Scenario::AdultBlackmail));
        assert!(out.body.contains("evidentiary"));
        assert!(out.body.contains("ANL-20260101-deadbeef"));
        assert!(out.body.contains("stopncii.org"));
        assert!(out.body.contains("ic3.gov"));
    }

    #[test]
    fn general_explainer_is_educational() {
        let out = render_callback(CallbackAction::WhatIsAiGenerated, &ctx(Scenario::General));
        assert!(out.body.contains("generative models"));
    }

    #[test]
    fn every_callback_reply_offers_a_way_back_to_the_menu() {
        let out = render_callback(CallbackAction::StopTheSpread, &ctx(Scenario::TeenagerSos));
        let labels: Vec<&str> = out
            .keyboard
            .rows
            .iter()
            .flatten()
            .map(|b| b.label.as_str())
            .collect();
        assert!(labels.contains(&"Back to Main Menu"));
    }
}
