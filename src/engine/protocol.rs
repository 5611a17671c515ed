use crate::engine::cancel::CancelToken;
use crate::model::generated::Generated;
use crate::model::turn::TurnState;

/// Requests from the window to the engine thread.
///
/// Turn commands carry the window's session generation, echoed back on
/// every event they cause, and turn-starting ones carry the token the
/// window will trip to abort them.
#[derive(Debug)]
pub enum EngineCommand {
    /// Open a session from whatever the session store holds.
    BeginStory { generation: u64, cancel: CancelToken },
    Choose {
        generation: u64,
        choice: String,
        cancel: CancelToken,
    },
    Retry { generation: u64, cancel: CancelToken },
    /// Leave the play screen; the loop goes back to idle.
    Abandon { generation: u64 },
    SuggestStartupTypes,
    TestConnection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineResponse {
    /// No session parameters: go back to the setup screen.
    RedirectToSetup,
    StateChanged(TurnState),
    /// Story text at the start of a turn, before anything streams in.
    StoryReset(String),
    /// One more fragment to append to the story.
    StoryChunk(String),
    ChoicesCleared,
    ChoicesReady(Generated<Vec<String>>),
    TurnFailed { reason: String },
    /// A command did not fit the current turn state and was ignored.
    Rejected { reason: String },
    StartupTypeSuggestions(Generated<Vec<String>>),
    ConnectionStatus(Result<String, String>),
}

impl EngineResponse {
    /// Whether this belongs to one play session, as opposed to the setup
    /// screen or settings window.
    pub fn is_turn_scoped(&self) -> bool {
        !matches!(
            self,
            EngineResponse::StartupTypeSuggestions(_) | EngineResponse::ConnectionStatus(_)
        )
    }
}

/// A response tagged with the session generation of the command that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    pub generation: u64,
    pub response: EngineResponse,
}
