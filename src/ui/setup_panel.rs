use eframe::egui;

use super::app::StartupSimApp;

enum SetupAction {
    Start,
    RegenerateDefaults,
    FetchSuggestions,
    PickSuggestion(String),
}

pub fn draw_setup_panel(ctx: &egui::Context, app: &mut StartupSimApp) {
    let mut action: Option<SetupAction> = None;

    egui::CentralPanel::default().show(ctx, |ui| {
        egui::ScrollArea::vertical().show(ui, |ui| {
            let form = &mut app.ui.setup;

            if let Some(notice) = &form.notice {
                ui.colored_label(egui::Color32::from_rgb(200, 150, 60), notice);
                ui.add_space(6.0);
            }

            /* -------- Company -------- */

            ui.label("公司名称");
            ui.add(
                egui::TextEdit::singleline(&mut form.params.company_name)
                    .hint_text("输入你的公司名称")
                    .desired_width(f32::INFINITY),
            );
            ui.add_space(8.0);

            /* -------- Startup type -------- */

            ui.label("创业类型");
            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut form.params.startup_type)
                        .hint_text("选择或输入创业类型")
                        .desired_width(ui.available_width() - 110.0),
                );

                if form.loading_suggestions {
                    ui.spinner();
                } else if ui.button("换个创业类型").clicked() {
                    action = Some(SetupAction::FetchSuggestions);
                }
            });

            if !form.suggestions.is_empty() {
                ui.horizontal_wrapped(|ui| {
                    for suggestion in &form.suggestions {
                        if ui.small_button(suggestion).clicked() {
                            action = Some(SetupAction::PickSuggestion(suggestion.clone()));
                        }
                    }
                });
                if form.suggestions_fallback {
                    ui.weak("（网络推荐不可用，显示本地推荐）");
                }
            }
            ui.add_space(8.0);

            /* -------- Location -------- */

            ui.label("创业地点");
            ui.add(
                egui::TextEdit::singleline(&mut form.params.location)
                    .hint_text("输入创业地点（如：北京中关村）")
                    .desired_width(f32::INFINITY),
            );
            ui.add_space(8.0);

            /* -------- Team -------- */

            ui.label("团队信息");
            ui.add(
                egui::TextEdit::multiline(&mut form.params.team_info)
                    .hint_text("描述你的创始团队（如：技术出身的创始人，5年互联网经验，有3个核心技术成员）")
                    .desired_rows(4)
                    .desired_width(f32::INFINITY),
            );
            ui.add_space(12.0);

            if let Some(err) = &form.error {
                ui.colored_label(
                    egui::Color32::from_rgb(200, 70, 70),
                    format!("{}：{}", err.title(), err),
                );
                ui.add_space(6.0);
            }

            let full_width = [ui.available_width(), 32.0];
            ui.add_enabled_ui(!form.loading_suggestions, |ui| {
                if ui.add_sized(full_width, egui::Button::new("开始创业之旅")).clicked() {
                    action = Some(SetupAction::Start);
                }
                if ui.add_sized(full_width, egui::Button::new("换个创业方案")).clicked() {
                    action = Some(SetupAction::RegenerateDefaults);
                }
            });
        });
    });

    match action {
        Some(SetupAction::Start) => app.start_game(),
        Some(SetupAction::RegenerateDefaults) => app.regenerate_defaults(),
        Some(SetupAction::FetchSuggestions) => app.request_suggestions(),
        Some(SetupAction::PickSuggestion(suggestion)) => {
            app.ui.setup.params.startup_type = suggestion;
            app.ui.setup.error = None;
        }
        None => {}
    }
}
