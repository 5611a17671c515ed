use rand::Rng;

use crate::engine::cancel::CancelToken;
use crate::engine::defaults::produce_suggestions;
use crate::engine::llm_client::{ChatBackend, LlmError};
use crate::engine::prompt_builder::PromptBuilder;
use crate::model::generated::Generated;
use crate::model::llm_decode::{decode_choices, decode_startup_types, fallback_choices};
use crate::model::scenario::ScenarioParams;

pub const SUGGESTION_COUNT: usize = 5;

/// The four narrative operations on top of a chat backend.
///
/// Story calls stream and report transport failures to the caller. The
/// structured calls never fail: anything unusable degrades to a static value.
pub struct NarrativeClient<B> {
    backend: B,
}

impl<B: ChatBackend> NarrativeClient<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn generate_initial_story(
        &self,
        params: &ScenarioParams,
        cancel: &CancelToken,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<(), LlmError> {
        let messages = PromptBuilder::initial_story(params);
        self.backend.stream_chat(&messages, cancel, on_chunk)
    }

    pub fn generate_next_event(
        &self,
        prior_story: &str,
        choice: &str,
        context: &str,
        cancel: &CancelToken,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<(), LlmError> {
        let messages = PromptBuilder::next_event(prior_story, choice, context);
        self.backend.stream_chat(&messages, cancel, on_chunk)
    }

    pub fn generate_choices(
        &self,
        story: &str,
        context: &str,
        cancel: &CancelToken,
    ) -> Generated<Vec<String>> {
        let messages = PromptBuilder::choices(story, context);

        let reason = match self.backend.complete_json(&messages, cancel) {
            Ok(content) => match decode_choices(content.as_deref()) {
                Ok(choices) => return Generated::live(choices),
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };

        log::warn!("choice generation fell back to defaults: {reason}");
        Generated::fallback(fallback_choices(), reason)
    }

    /// Network suggestions, or a local sample when anything goes wrong.
    /// The local sample is drawn before the request is made.
    pub fn generate_startup_type_suggestions<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Generated<Vec<String>> {
        let local = produce_suggestions(rng, SUGGESTION_COUNT);
        let messages = PromptBuilder::startup_types(SUGGESTION_COUNT);

        let reason = match self.backend.complete_json(&messages, cancel) {
            Ok(content) => match decode_startup_types(content.as_deref()) {
                Ok(mut types) => {
                    types.truncate(SUGGESTION_COUNT);
                    return Generated::live(types);
                }
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };

        log::warn!("startup type suggestions fell back to local pool: {reason}");
        Generated::fallback(local, reason)
    }
}
