use serde::{Deserialize, Serialize};

/// Appended to the story before a continuation segment streams in.
pub const STORY_SEPARATOR: &str = "\n\n---\n\n";

/// Where the turn loop currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    #[default]
    Idle,
    GeneratingStory,
    GeneratingChoices,
    AwaitingSelection,
    /// The story stream broke off; the turn can be retried.
    Interrupted,
}

impl TurnState {
    /// True while a request for the current turn is outstanding.
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            TurnState::GeneratingStory | TurnState::GeneratingChoices
        )
    }

    pub fn accepts_choice(self) -> bool {
        self == TurnState::AwaitingSelection
    }
}
