use forensics_core::Scenario;
use serde::{Deserialize, Serialize};

/// Conversation state machine (spec §4.2). Keyed by `(chat_id, user_id)` in
/// storage; the discriminant is stored as a column and the variant's fields
/// as a JSON payload so the table schema never needs a migration when a new
/// variant is added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConversationState {
    /// Default/implicit state: no scenario chosen yet, and the state a
    /// conversation reverts to once its TTL expires.
    SelectingScenario,
    /// Adult-blackmail scenario: waiting for the evidence screenshot/photo.
    AdultWaitingForEvidence,
    /// Teenager-SOS scenario: the "stop, you are safe" message has been shown.
    TeenagerStopShown,
    /// Teenager-SOS scenario: waiting for the photo to analyze.
    TeenagerWaitingForPhoto,
    /// A job has been enqueued and the worker is processing it.
    AnalysisInFlight {
        job_id: String,
        progress_msg_id: i64,
        scenario: Scenario,
    },
    /// The analysis finished and its result message is being interacted with
    /// (callback buttons for counter-measures, parent-helper, etc).
    ReviewingResult {
        analysis_id: String,
        scenario: Scenario,
    },
}

impl ConversationState {
    pub fn discriminant(&self) -> &'static str {
        match self {
            ConversationState::SelectingScenario => "selecting_scenario",
            ConversationState::AdultWaitingForEvidence => "adult_waiting_for_evidence",
            ConversationState::TeenagerStopShown => "teenager_stop_shown",
            ConversationState::TeenagerWaitingForPhoto => "teenager_waiting_for_photo",
            ConversationState::AnalysisInFlight { .. } => "analysis_in_flight",
            ConversationState::ReviewingResult { .. } => "reviewing_result",
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        ConversationState::SelectingScenario
    }
}

/// A persisted conversation, one row per `(chat_id, user_id)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub chat_id: String,
    pub user_id: String,
    pub state: ConversationState,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminant_matches_serde_tag() {
        let s = ConversationState::AnalysisInFlight {
            job_id: "j1".into(),
            progress_msg_id: 42,
            scenario: Scenario::General,
        };
        assert_eq!(s.discriminant(), "analysis_in_flight");
    }

    #[test]
    fn default_is_selecting_scenario() {
        assert_eq!(ConversationState::default(), ConversationState::SelectingScenario);
    }
}
