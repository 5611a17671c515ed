#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use startup_story_simulator::engine::cancel::CancelToken;
use startup_story_simulator::engine::llm_client::{ChatBackend, ChatMessage, LlmError};
use startup_story_simulator::engine::protocol::EngineResponse;
use startup_story_simulator::model::scenario::ScenarioParams;

/// How one scripted story stream behaves.
pub enum StreamScript {
    Chunks(Vec<&'static str>),
    /// Deliver the chunks, then drop the connection.
    BreakAfter(Vec<&'static str>),
}

/// In-memory backend that replays queued answers and records every request.
#[derive(Default, Clone)]
pub struct ScriptedBackend {
    streams: Arc<Mutex<VecDeque<StreamScript>>>,
    structured: Arc<Mutex<VecDeque<Option<String>>>>,
    pub requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream(self, script: StreamScript) -> Self {
        self.streams.lock().unwrap().push_back(script);
        self
    }

    pub fn answer(self, content: Option<&str>) -> Self {
        self.structured
            .lock()
            .unwrap()
            .push_back(content.map(str::to_string));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn user_prompt(&self, index: usize) -> String {
        self.requests.lock().unwrap()[index][1].content.clone()
    }
}

impl ChatBackend for ScriptedBackend {
    fn stream_chat(
        &self,
        messages: &[ChatMessage],
        cancel: &CancelToken,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<(), LlmError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let script = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StreamScript::Chunks(Vec::new()));

        let (chunks, breaks) = match script {
            StreamScript::Chunks(chunks) => (chunks, false),
            StreamScript::BreakAfter(chunks) => (chunks, true),
        };

        for chunk in chunks {
            if cancel.is_cancelled() {
                return Err(LlmError::Cancelled);
            }
            on_delta(chunk);
        }

        if breaks {
            return Err(LlmError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset",
            )));
        }
        Ok(())
    }

    fn complete_json(
        &self,
        messages: &[ChatMessage],
        cancel: &CancelToken,
    ) -> Result<Option<String>, LlmError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }
        match self.structured.lock().unwrap().pop_front() {
            Some(content) => Ok(content),
            None => Err(LlmError::EmptyResponse),
        }
    }

    fn test_connection(&self) -> Result<String, LlmError> {
        Ok("scripted backend".into())
    }
}

pub fn scenario() -> ScenarioParams {
    ScenarioParams::new(
        "星辰科技",
        "AI教育平台",
        "北京海淀区中关村",
        "创始团队来自清华计算机系，有3个AI算法专家",
    )
}

/// The story as the window would show it after each streamed fragment.
pub fn story_updates(events: &[EngineResponse]) -> Vec<String> {
    let mut story = String::new();
    let mut shown = Vec::new();
    for event in events {
        match event {
            EngineResponse::StoryReset(text) => story = text.clone(),
            EngineResponse::StoryChunk(chunk) => {
                story.push_str(chunk);
                shown.push(story.clone());
            }
            _ => {}
        }
    }
    shown
}

pub fn position(events: &[EngineResponse], wanted: &EngineResponse) -> usize {
    events
        .iter()
        .position(|e| e == wanted)
        .unwrap_or_else(|| panic!("{wanted:?} not found in {events:?}"))
}
