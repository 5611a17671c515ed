use eframe::egui;

use super::app::StartupSimApp;
use crate::model::turn::TurnState;

enum PlayAction {
    Choose(String),
    Retry,
    BackToSetup,
}

pub fn draw_play_panel(ctx: &egui::Context, app: &mut StartupSimApp) {
    let mut action: Option<PlayAction> = None;
    let dim_while_generating = app.ui.settings.dim_story_while_generating;
    let play = &app.ui.play;

    // ---------- Footer ----------
    egui::TopBottomPanel::bottom("play_footer").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui.button("← 返回设置").clicked() {
                action = Some(PlayAction::BackToSetup);
            }
            ui.weak(state_label(play.turn_state));
        });
    });

    // ---------- Story + choices ----------
    egui::CentralPanel::default().show(ctx, |ui| {
        egui::ScrollArea::vertical()
            .stick_to_bottom(play.turn_state == TurnState::GeneratingStory)
            .show(ui, |ui| {
                let generating = play.turn_state == TurnState::GeneratingStory;
                let mut color = ui.visuals().text_color();
                if generating && dim_while_generating {
                    color = color.gamma_multiply(0.5);
                }

                let text = if play.story.is_empty() {
                    "加载中..."
                } else {
                    play.story.as_str()
                };
                ui.label(egui::RichText::new(text).color(color));
                ui.add_space(12.0);

                if let Some(reason) = &play.failure {
                    ui.colored_label(
                        egui::Color32::from_rgb(200, 70, 70),
                        format!("故事生成中断：{reason}"),
                    );
                    if ui.button("重试").clicked() {
                        action = Some(PlayAction::Retry);
                    }
                    return;
                }

                if let Some(notice) = &play.notice {
                    ui.weak(notice);
                }

                match play.turn_state {
                    TurnState::GeneratingChoices => {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("正在思考可能的选择...");
                        });
                    }
                    TurnState::AwaitingSelection if play.choices.is_empty() => {
                        ui.vertical_centered(|ui| {
                            ui.weak("暂无可用选项");
                        });
                    }
                    TurnState::AwaitingSelection => {
                        for choice in &play.choices {
                            let button = egui::Button::new(choice).wrap();
                            if ui
                                .add_sized([ui.available_width(), 40.0], button)
                                .clicked()
                            {
                                action = Some(PlayAction::Choose(choice.clone()));
                            }
                        }
                        if play.choices_fallback {
                            ui.weak("（使用默认选项）");
                        }
                    }
                    TurnState::Idle | TurnState::GeneratingStory | TurnState::Interrupted => {}
                }
            });
    });

    match action {
        Some(PlayAction::Choose(choice)) => app.choose(choice),
        Some(PlayAction::Retry) => app.retry_turn(),
        Some(PlayAction::BackToSetup) => app.back_to_setup(),
        None => {}
    }
}

fn state_label(state: TurnState) -> &'static str {
    match state {
        TurnState::Idle => "",
        TurnState::GeneratingStory => "故事生成中…",
        TurnState::GeneratingChoices => "选项生成中…",
        TurnState::AwaitingSelection => "请做出你的选择",
        TurnState::Interrupted => "生成中断",
    }
}
