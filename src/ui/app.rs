use eframe::egui;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::cancel::CancelToken;
use crate::engine::defaults::produce_defaults;
use crate::engine::engine::EngineHandle;
use crate::engine::protocol::{EngineCommand, EngineEvent, EngineResponse};
use crate::model::scenario::{ScenarioParams, SetupError};
use crate::model::session::SessionStore;
use crate::model::turn::TurnState;
use crate::ui::play_panel::draw_play_panel;
use crate::ui::settings::UiSettings;
use crate::ui::settings_io::save_settings;
use crate::ui::setup_panel::draw_setup_panel;

const CJK_FONT_NAME: &str = "cjk";

const CJK_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/STHeiti Light.ttc",
    "C:\\Windows\\Fonts\\msyh.ttc",
    "C:\\Windows\\Fonts\\simhei.ttf",
];

/* =========================
   Screens
   ========================= */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Screen {
    #[default]
    Setup,
    Play,
}

#[derive(Default)]
pub(crate) struct SetupForm {
    pub params: ScenarioParams,
    pub suggestions: Vec<String>,
    pub suggestions_fallback: bool,
    pub loading_suggestions: bool,
    pub error: Option<SetupError>,
    pub notice: Option<String>,
}

#[derive(Default)]
pub(crate) struct PlayState {
    pub story: String,
    pub choices: Vec<String>,
    pub choices_fallback: bool,
    pub turn_state: TurnState,
    pub failure: Option<String>,
    pub notice: Option<String>,
}

/* =========================
   UI State
   ========================= */

#[derive(Default)]
pub(crate) struct UiState {
    pub screen: Screen,
    pub setup: SetupForm,
    pub play: PlayState,

    pub settings: UiSettings,
    pub show_settings_window: bool,
    pub font_path_input: String,
    pub loaded_font: Option<PathBuf>,
    pub testing_connection: bool,
    pub connection_status: Option<Result<String, String>>,
}

/* =========================
   App
   ========================= */

pub struct StartupSimApp {
    pub(crate) ui: UiState,
    session: SessionStore,
    turn_cancel: Option<CancelToken>,
    /// Bumped on every start and every return to setup.
    generation: u64,

    cmd_tx: mpsc::Sender<EngineCommand>,
    resp_rx: mpsc::Receiver<EngineEvent>,
}

impl StartupSimApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: UiSettings,
        engine: EngineHandle,
        session: SessionStore,
    ) -> Self {
        let loaded_font = install_cjk_font(&cc.egui_ctx, settings.cjk_font_path.as_deref());
        let mut app = Self::with_channels(settings, engine.cmd_tx, engine.resp_rx, session);
        app.ui.loaded_font = loaded_font;
        app
    }

    pub(crate) fn with_channels(
        settings: UiSettings,
        cmd_tx: mpsc::Sender<EngineCommand>,
        resp_rx: mpsc::Receiver<EngineEvent>,
        session: SessionStore,
    ) -> Self {
        let font_path_input = settings
            .cjk_font_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        Self {
            ui: UiState {
                setup: SetupForm {
                    params: produce_defaults(&mut rand::thread_rng()),
                    ..Default::default()
                },
                settings,
                font_path_input,
                ..Default::default()
            },
            session,
            turn_cancel: None,
            generation: 0,
            cmd_tx,
            resp_rx,
        }
    }

    pub(crate) fn send_command(&self, cmd: EngineCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            log::error!("engine thread is gone; command dropped");
        }
    }

    /// Abort whatever turn is running and hand out a token for the next.
    fn next_turn_token(&mut self) -> CancelToken {
        if let Some(previous) = self.turn_cancel.take() {
            previous.cancel();
        }
        let token = CancelToken::new();
        self.turn_cancel = Some(token.clone());
        token
    }

    /* ---------- setup actions ---------- */

    pub(crate) fn regenerate_defaults(&mut self) {
        self.ui.setup.params = produce_defaults(&mut rand::thread_rng());
        self.ui.setup.error = None;
    }

    pub(crate) fn request_suggestions(&mut self) {
        if self.ui.setup.loading_suggestions {
            return;
        }
        self.ui.setup.loading_suggestions = true;
        self.send_command(EngineCommand::SuggestStartupTypes);
    }

    pub(crate) fn start_game(&mut self) {
        if let Err(e) = self.ui.setup.params.validate() {
            self.ui.setup.error = Some(e);
            return;
        }

        self.ui.setup.error = None;
        self.ui.setup.notice = None;
        self.session.initialize(self.ui.setup.params.clone());

        self.ui.play = PlayState {
            turn_state: TurnState::GeneratingStory,
            ..Default::default()
        };
        self.ui.screen = Screen::Play;

        self.generation += 1;
        let cancel = self.next_turn_token();
        self.send_command(EngineCommand::BeginStory {
            generation: self.generation,
            cancel,
        });
    }

    /* ---------- play actions ---------- */

    pub(crate) fn choose(&mut self, choice: String) {
        if !self.ui.play.turn_state.accepts_choice() {
            return;
        }
        // Buttons go away at once; the engine confirms with ChoicesCleared.
        self.ui.play.choices.clear();
        self.ui.play.turn_state = TurnState::GeneratingStory;
        self.ui.play.notice = None;

        let cancel = self.next_turn_token();
        self.send_command(EngineCommand::Choose {
            generation: self.generation,
            choice,
            cancel,
        });
    }

    pub(crate) fn retry_turn(&mut self) {
        if self.ui.play.turn_state != TurnState::Interrupted {
            return;
        }
        self.ui.play.failure = None;
        self.ui.play.notice = None;
        self.ui.play.turn_state = TurnState::GeneratingStory;

        let cancel = self.next_turn_token();
        self.send_command(EngineCommand::Retry {
            generation: self.generation,
            cancel,
        });
    }

    pub(crate) fn back_to_setup(&mut self) {
        if let Some(token) = self.turn_cancel.take() {
            token.cancel();
        }
        self.generation += 1;
        self.send_command(EngineCommand::Abandon {
            generation: self.generation,
        });
        self.ui.play = PlayState::default();
        self.ui.screen = Screen::Setup;
    }

    /* ---------- engine responses ---------- */

    fn pump_events(&mut self) {
        while let Ok(event) = self.resp_rx.try_recv() {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: EngineEvent) {
        if event.response.is_turn_scoped() && event.generation != self.generation {
            log::debug!(
                "dropping {:?} from session generation {} (now {})",
                event.response,
                event.generation,
                self.generation
            );
            return;
        }
        self.apply_response(event.response);
    }

    fn apply_response(&mut self, resp: EngineResponse) {
        match resp {
            EngineResponse::RedirectToSetup => {
                self.ui.play = PlayState::default();
                self.ui.screen = Screen::Setup;
                self.ui.setup.notice = Some("请先填写创业信息".into());
            }
            EngineResponse::StateChanged(state) => {
                self.ui.play.turn_state = state;
                if state == TurnState::GeneratingStory {
                    self.ui.play.failure = None;
                }
            }
            EngineResponse::StoryReset(text) => {
                self.ui.play.story = text;
            }
            EngineResponse::StoryChunk(chunk) => {
                self.ui.play.story.push_str(&chunk);
            }
            EngineResponse::ChoicesCleared => {
                self.ui.play.choices.clear();
                self.ui.play.choices_fallback = false;
            }
            EngineResponse::ChoicesReady(generated) => {
                self.ui.play.choices_fallback = generated.is_fallback();
                self.ui.play.choices = generated.into_value();
            }
            EngineResponse::TurnFailed { reason } => {
                self.ui.play.failure = Some(reason);
            }
            EngineResponse::Rejected { reason } => {
                self.ui.play.notice = Some(reason);
            }
            EngineResponse::StartupTypeSuggestions(generated) => {
                self.ui.setup.loading_suggestions = false;
                self.ui.setup.suggestions_fallback = generated.is_fallback();
                self.ui.setup.suggestions = generated.into_value();
            }
            EngineResponse::ConnectionStatus(status) => {
                self.ui.testing_connection = false;
                self.ui.connection_status = Some(status);
            }
        }
    }

    fn is_waiting(&self) -> bool {
        self.ui.play.turn_state.is_loading()
            || self.ui.setup.loading_suggestions
            || self.ui.testing_connection
    }

    /* ---------- settings window ---------- */

    fn draw_settings_window(&mut self, ctx: &egui::Context) {
        let mut open = self.ui.show_settings_window;
        let mut apply_font = false;
        let mut test_connection = false;
        let mut save = false;

        egui::Window::new("设置")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label("界面缩放");
                ui.add(egui::Slider::new(
                    &mut self.ui.settings.ui_scale,
                    UiSettings::MIN_SCALE..=UiSettings::MAX_SCALE,
                ));

                ui.checkbox(
                    &mut self.ui.settings.dim_story_while_generating,
                    "生成时淡化故事文本",
                );

                ui.separator();
                ui.label("中文字体路径");
                ui.horizontal(|ui| {
                    ui.text_edit_singleline(&mut self.ui.font_path_input);
                    if ui.button("应用").clicked() {
                        apply_font = true;
                    }
                });
                match &self.ui.loaded_font {
                    Some(path) => ui.weak(format!("当前字体：{}", path.display())),
                    None => ui.weak("未找到中文字体"),
                };

                ui.separator();
                ui.horizontal(|ui| {
                    let button = ui.add_enabled(
                        !self.ui.testing_connection,
                        egui::Button::new("测试连接"),
                    );
                    if button.clicked() {
                        test_connection = true;
                    }
                    if self.ui.testing_connection {
                        ui.spinner();
                    }
                });
                match &self.ui.connection_status {
                    Some(Ok(status)) => {
                        ui.colored_label(egui::Color32::from_rgb(60, 160, 90), status);
                    }
                    Some(Err(reason)) => {
                        ui.colored_label(egui::Color32::from_rgb(200, 70, 70), reason);
                    }
                    None => {}
                }

                ui.separator();
                if ui.button("保存设置").clicked() {
                    save = true;
                }
            });

        self.ui.show_settings_window = open;

        if apply_font {
            let trimmed = self.ui.font_path_input.trim();
            self.ui.settings.cjk_font_path = (!trimmed.is_empty()).then(|| PathBuf::from(trimmed));
            self.ui.loaded_font = install_cjk_font(ctx, self.ui.settings.cjk_font_path.as_deref());
        }
        if test_connection {
            self.ui.testing_connection = true;
            self.ui.connection_status = None;
            self.send_command(EngineCommand::TestConnection);
        }
        if save {
            save_settings(&self.ui.settings);
        }
    }
}

/* =========================
   egui App
   ========================= */

impl eframe::App for StartupSimApp {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        ctx.set_pixels_per_point(self.ui.settings.effective_scale());

        self.pump_events();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("AI创业模拟器");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("⚙ 设置").clicked() {
                        self.ui.show_settings_window = !self.ui.show_settings_window;
                    }
                });
            });
        });

        match self.ui.screen {
            Screen::Setup => draw_setup_panel(ctx, self),
            Screen::Play => draw_play_panel(ctx, self),
        }

        if self.ui.show_settings_window {
            self.draw_settings_window(ctx);
        }

        if self.is_waiting() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}

/* =========================
   Fonts
   ========================= */

/// Add the first readable CJK font as a fallback for every family.
pub fn install_cjk_font(ctx: &egui::Context, configured: Option<&Path>) -> Option<PathBuf> {
    let candidates = configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(CJK_FONT_CANDIDATES.iter().map(PathBuf::from));

    for path in candidates {
        let Ok(bytes) = fs::read(&path) else {
            continue;
        };

        let mut fonts = egui::FontDefinitions::default();
        fonts.font_data.insert(
            CJK_FONT_NAME.to_owned(),
            Arc::new(egui::FontData::from_owned(bytes)),
        );
        for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
            fonts
                .families
                .entry(family)
                .or_default()
                .push(CJK_FONT_NAME.to_owned());
        }
        ctx.set_fonts(fonts);

        log::info!("loaded CJK font from {}", path.display());
        return Some(path);
    }

    log::warn!("no CJK font found; Chinese text may render as boxes");
    None
}
