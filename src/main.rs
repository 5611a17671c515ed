use anyhow::Context;
use eframe::egui;

use startup_story_simulator::engine::engine::Engine;
use startup_story_simulator::engine::llm_client::{LlmConfig, OpenAiBackend};
use startup_story_simulator::engine::narrative_client::NarrativeClient;
use startup_story_simulator::model::session::SessionStore;
use startup_story_simulator::ui::app::StartupSimApp;
use startup_story_simulator::ui::settings_io::load_settings;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let settings = load_settings();
    let config = LlmConfig::from_env();
    log::info!("using model {} at {}", config.model, config.base_url);

    let backend = OpenAiBackend::new(config).context("could not build HTTP client")?;
    let session = SessionStore::new();
    let engine = Engine::spawn(NarrativeClient::new(backend), session.clone());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([720.0, 820.0]),
        ..Default::default()
    };

    eframe::run_native(
        "AI创业模拟器",
        options,
        Box::new(move |cc| Ok(Box::new(StartupSimApp::new(cc, settings, engine, session)))),
    )
    .map_err(|e| anyhow::anyhow!("window closed with an error: {e}"))
}
