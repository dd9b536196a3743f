//! Converts the renderer's platform-neutral [`forensics_notify::Keyboard`]
//! into a teloxide `InlineKeyboardMarkup`, plus the scenario-selection
//! keyboards that live entirely on the Telegram side (spec §4.2 — C1/C2
//! own scenario selection, C5 only renders the post-verdict keyboard).

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use forensics_notify::Keyboard;

/// `callback_data` for the scenario-selection menu shown by `/start` and
/// "Back to Main Menu" (spec §4.2 transitions `select(adult|teenager|general)`).
pub const SELECT_ADULT: &str = "select_adult";
pub const SELECT_TEENAGER: &str = "select_teenager";
pub const SELECT_GENERAL: &str = "select_general";
/// TeenagerStopShown --ready--> TeenagerWaitingForPhoto.
pub const TEENAGER_READY: &str = "teenager_ready";

pub fn to_markup(kb: &Keyboard) -> InlineKeyboardMarkup {
    let rows = kb
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.action.data()))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

pub fn scenario_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "I'm being blackmailed",
            SELECT_ADULT,
        )],
        vec![InlineKeyboardButton::callback(
            "I'm a teenager and need help",
            SELECT_TEENAGER,
        )],
        vec![InlineKeyboardButton::callback(
            "Check an image",
            SELECT_GENERAL,
        )],
    ])
}

pub fn teenager_ready_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "I'm ready",
        TEENAGER_READY,
    )]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use forensics_notify::{Button, CallbackAction};

    #[test]
    fn converts_rows_and_labels() {
        let kb = Keyboard::default().row(vec![Button::new("Back", CallbackAction::BackToMainMenu)]);
        let markup = to_markup(&kb);
        assert_eq!(markup.inline_keyboard.len(), 1);
        assert_eq!(markup.inline_keyboard[0].len(), 1);
    }

    #[test]
    fn scenario_menu_has_three_options() {
        let markup = scenario_menu();
        assert_eq!(markup.inline_keyboard.len(), 3);
    }
}
