use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::engine::cancel::CancelToken;
use crate::engine::llm_client::ChatBackend;
use crate::engine::narrative_client::NarrativeClient;
use crate::engine::protocol::{EngineCommand, EngineEvent, EngineResponse};
use crate::engine::turn_loop::TurnLoop;
use crate::model::session::SessionStore;

/// Channel ends the window keeps after spawning the engine thread.
pub struct EngineHandle {
    pub cmd_tx: Sender<EngineCommand>,
    pub resp_rx: Receiver<EngineEvent>,
    pub thread: JoinHandle<()>,
}

pub struct Engine<B> {
    rx: Receiver<EngineCommand>,
    tx: Sender<EngineEvent>,
    turns: TurnLoop<B>,
    rng: StdRng,
    /// Session generation of the last turn command served.
    generation: u64,
}

impl<B: ChatBackend> Engine<B> {
    pub fn new(
        rx: Receiver<EngineCommand>,
        tx: Sender<EngineEvent>,
        client: NarrativeClient<B>,
        session: SessionStore,
    ) -> Self {
        Self {
            rx,
            tx,
            turns: TurnLoop::new(client, session),
            rng: StdRng::from_entropy(),
            generation: 0,
        }
    }

    /// Replace the random source used for local suggestions.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Process commands until every sender is gone.
    pub fn run(&mut self) {
        while let Ok(cmd) = self.rx.recv() {
            self.handle(cmd);
        }
        log::debug!("engine command channel closed");
    }

    fn handle(&mut self, cmd: EngineCommand) {
        match &cmd {
            EngineCommand::BeginStory { generation, .. }
            | EngineCommand::Choose { generation, .. }
            | EngineCommand::Retry { generation, .. }
            | EngineCommand::Abandon { generation } => self.generation = *generation,
            EngineCommand::SuggestStartupTypes | EngineCommand::TestConnection => {}
        }

        let tx = self.tx.clone();
        let generation = self.generation;
        let mut sink = move |response: EngineResponse| {
            let _ = tx.send(EngineEvent {
                generation,
                response,
            });
        };

        match cmd {
            EngineCommand::BeginStory { cancel, .. } => {
                self.turns.start(&cancel, &mut sink);
            }

            EngineCommand::Choose { choice, cancel, .. } => {
                if let Err(e) = self.turns.choose(&choice, &cancel, &mut sink) {
                    log::warn!("choice rejected: {e}");
                    sink(EngineResponse::Rejected {
                        reason: e.to_string(),
                    });
                }
            }

            EngineCommand::Retry { cancel, .. } => {
                if let Err(e) = self.turns.retry(&cancel, &mut sink) {
                    log::warn!("retry rejected: {e}");
                    sink(EngineResponse::Rejected {
                        reason: e.to_string(),
                    });
                }
            }

            EngineCommand::Abandon { .. } => {
                self.turns.reset(&mut sink);
            }

            EngineCommand::SuggestStartupTypes => {
                let suggestions = self
                    .turns
                    .client()
                    .generate_startup_type_suggestions(&mut self.rng, &CancelToken::new());
                sink(EngineResponse::StartupTypeSuggestions(suggestions));
            }

            EngineCommand::TestConnection => {
                let status = self
                    .turns
                    .client()
                    .backend()
                    .test_connection()
                    .map_err(|e| e.to_string());
                if let Err(e) = &status {
                    log::warn!("connection test failed: {e}");
                }
                sink(EngineResponse::ConnectionStatus(status));
            }
        }
    }
}

impl<B: ChatBackend + 'static> Engine<B> {
    /// Move a fresh engine onto its own thread.
    pub fn spawn(client: NarrativeClient<B>, session: SessionStore) -> EngineHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();

        let thread = thread::spawn(move || {
            let mut engine = Engine::new(cmd_rx, resp_tx, client, session);
            engine.run();
        });

        EngineHandle {
            cmd_tx,
            resp_rx,
            thread,
        }
    }
}
