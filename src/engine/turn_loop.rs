//! The per-session turn state machine.
//!
//! `Idle -> GeneratingStory -> GeneratingChoices -> AwaitingSelection ->
//! GeneratingStory -> ...`, with `Interrupted` as a side exit when the story
//! stream breaks. Story and choices are fetched strictly one after the
//! other, so at most one request is outstanding per turn.

use thiserror::Error;

use crate::engine::cancel::CancelToken;
use crate::engine::llm_client::{ChatBackend, LlmError};
use crate::engine::narrative_client::NarrativeClient;
use crate::engine::prompt_builder::scenario_context;
use crate::engine::protocol::EngineResponse;
use crate::model::session::SessionStore;
use crate::model::turn::{TurnState, STORY_SEPARATOR};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("cannot {action} while {state:?}")]
    WrongState {
        action: &'static str,
        state: TurnState,
    },
    #[error("\"{0}\" is not one of the offered choices")]
    UnknownChoice(String),
}

/// What the last story request was for, kept so it can be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingTurn {
    Opening,
    Continue { prior_story: String, choice: String },
}

pub struct TurnLoop<B> {
    client: NarrativeClient<B>,
    session: SessionStore,
    state: TurnState,
    story: String,
    choices: Vec<String>,
    pending: Option<PendingTurn>,
    turn: u32,
}

impl<B: ChatBackend> TurnLoop<B> {
    pub fn new(client: NarrativeClient<B>, session: SessionStore) -> Self {
        Self {
            client,
            session,
            state: TurnState::Idle,
            story: String::new(),
            choices: Vec::new(),
            pending: None,
            turn: 0,
        }
    }

    pub fn client(&self) -> &NarrativeClient<B> {
        &self.client
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn story(&self) -> &str {
        &self.story
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// 1-based index of the current turn; 0 before the session opens.
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Open the session: stream the opening story, then fetch choices.
    /// Without a company name nothing is generated and the caller is told
    /// to go back to setup.
    pub fn start(&mut self, cancel: &CancelToken, sink: &mut dyn FnMut(EngineResponse)) {
        self.clear();

        if !self.session.is_started() {
            log::info!("no scenario parameters; redirecting to setup");
            self.state = TurnState::Idle;
            sink(EngineResponse::RedirectToSetup);
            return;
        }

        self.turn = 1;
        self.run_turn(PendingTurn::Opening, cancel, sink);
    }

    pub fn choose(
        &mut self,
        choice: &str,
        cancel: &CancelToken,
        sink: &mut dyn FnMut(EngineResponse),
    ) -> Result<(), TurnError> {
        if !self.state.accepts_choice() {
            return Err(TurnError::WrongState {
                action: "choose",
                state: self.state,
            });
        }
        if !self.choices.iter().any(|c| c == choice) {
            return Err(TurnError::UnknownChoice(choice.to_string()));
        }

        self.turn += 1;
        let pending = PendingTurn::Continue {
            prior_story: self.story.clone(),
            choice: choice.to_string(),
        };
        self.run_turn(pending, cancel, sink);
        Ok(())
    }

    /// Run the interrupted turn again from the story it started with.
    pub fn retry(
        &mut self,
        cancel: &CancelToken,
        sink: &mut dyn FnMut(EngineResponse),
    ) -> Result<(), TurnError> {
        let wrong_state = TurnError::WrongState {
            action: "retry",
            state: self.state,
        };
        if self.state != TurnState::Interrupted {
            return Err(wrong_state);
        }
        let Some(pending) = self.pending.take() else {
            return Err(wrong_state);
        };

        self.run_turn(pending, cancel, sink);
        Ok(())
    }

    /// Drop the session's story and go back to idle.
    pub fn reset(&mut self, sink: &mut dyn FnMut(EngineResponse)) {
        self.clear();
        self.set_state(TurnState::Idle, sink);
    }

    fn clear(&mut self) {
        self.story.clear();
        self.choices.clear();
        self.pending = None;
        self.turn = 0;
    }

    fn set_state(&mut self, state: TurnState, sink: &mut dyn FnMut(EngineResponse)) {
        log::debug!("turn {}: {:?} -> {:?}", self.turn, self.state, state);
        self.state = state;
        sink(EngineResponse::StateChanged(state));
    }

    fn run_turn(
        &mut self,
        pending: PendingTurn,
        cancel: &CancelToken,
        sink: &mut dyn FnMut(EngineResponse),
    ) {
        let params = self.session.snapshot();
        let context = scenario_context(&params);

        self.set_state(TurnState::GeneratingStory, sink);
        self.choices.clear();
        sink(EngineResponse::ChoicesCleared);

        self.story = match &pending {
            PendingTurn::Opening => String::new(),
            PendingTurn::Continue { prior_story, .. } => {
                format!("{prior_story}{STORY_SEPARATOR}")
            }
        };
        sink(EngineResponse::StoryReset(self.story.clone()));

        log::info!("turn {}: streaming story", self.turn);
        let streamed = {
            let Self { client, story, .. } = self;
            let mut on_chunk = |chunk: &str| {
                story.push_str(chunk);
                sink(EngineResponse::StoryChunk(chunk.to_string()));
            };

            match &pending {
                PendingTurn::Opening => client.generate_initial_story(&params, cancel, &mut on_chunk),
                PendingTurn::Continue { prior_story, choice } => client.generate_next_event(
                    prior_story,
                    choice,
                    &context,
                    cancel,
                    &mut on_chunk,
                ),
            }
        };

        match streamed {
            Ok(()) if !cancel.is_cancelled() => {}
            Ok(()) | Err(LlmError::Cancelled) => {
                log::info!("turn {}: cancelled", self.turn);
                self.set_state(TurnState::Idle, sink);
                return;
            }
            Err(e) => {
                log::error!("turn {}: story stream interrupted: {e}", self.turn);
                self.pending = Some(pending);
                self.set_state(TurnState::Interrupted, sink);
                sink(EngineResponse::TurnFailed {
                    reason: e.to_string(),
                });
                return;
            }
        }

        self.set_state(TurnState::GeneratingChoices, sink);
        let generated = self.client.generate_choices(&self.story, &context, cancel);

        if cancel.is_cancelled() {
            log::info!("turn {}: cancelled while fetching choices", self.turn);
            self.set_state(TurnState::Idle, sink);
            return;
        }

        self.choices = generated.value().clone();
        self.pending = None;
        log::info!(
            "turn {}: {} choices ready{}",
            self.turn,
            self.choices.len(),
            if generated.is_fallback() { " (fallback)" } else { "" }
        );

        sink(EngineResponse::ChoicesReady(generated));
        self.set_state(TurnState::AwaitingSelection, sink);
    }
}
