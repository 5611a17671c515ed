pub mod cancel;
pub mod defaults;
pub mod engine;
pub mod llm_client;
pub mod narrative_client;
pub mod prompt_builder;
pub mod protocol;
pub mod turn_loop;
