//! Chat tab: settings row, message log, typing indicator, input row.

use eframe::egui;

use session::NoticeLevel;

use crate::markdown;
use crate::settings_panel;
use crate::types::{AppState, ChatEntry, ChatRole};

pub fn show(ui: &mut egui::Ui, state: &mut AppState, dark: bool) {
    settings_panel::show(ui, state);
    ui.add_space(4.0);
    ui.separator();

    let input_height = 64.0;
    let chat_height = (ui.available_height() - input_height).max(120.0);

    egui::ScrollArea::vertical()
        .max_height(chat_height)
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for entry in &state.chat {
                ui.add_space(6.0);
                render_entry(ui, entry, dark);
            }

            if state.show_typing {
                ui.add_space(6.0);
                egui::Frame::none()
                    .fill(if dark {
                        egui::Color32::from_rgb(50, 50, 58)
                    } else {
                        egui::Color32::from_rgb(230, 230, 235)
                    })
                    .rounding(egui::Rounding::same(12.0))
                    .inner_margin(egui::Margin::same(10.0))
                    .show(ui, |ui| {
                        // Animated dots
                        let time = ui.input(|i| i.time);
                        let dots = match ((time * 2.0) as i64) % 4 {
                            0 => "   ",
                            1 => ".  ",
                            2 => ".. ",
                            _ => "...",
                        };
                        ui.label(
                            egui::RichText::new(format!("Tutor is typing{dots}"))
                                .italics()
                                .color(if dark {
                                    egui::Color32::from_rgb(160, 160, 180)
                                } else {
                                    egui::Color32::from_rgb(90, 90, 100)
                                }),
                        );
                    });
                ui.ctx().request_repaint();
            }
        });

    ui.add_space(8.0);

    ui.horizontal(|ui| {
        let response = ui.add_sized(
            [ui.available_width() - 80.0, 40.0],
            egui::TextEdit::singleline(&mut state.input_text)
                .hint_text("Ask your tutor a question...")
                .font(egui::FontId::new(15.0, egui::FontFamily::Proportional)),
        );

        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            state.send_message();
            response.request_focus();
        }

        let send = egui::Button::new("Send").fill(egui::Color32::from_rgb(70, 130, 180));
        if ui.add_sized([70.0, 40.0], send).clicked() {
            state.send_message();
        }
    });
}

fn render_entry(ui: &mut egui::Ui, entry: &ChatEntry, dark: bool) {
    match entry.role {
        ChatRole::System(level) => {
            ui.vertical_centered(|ui| {
                ui.label(
                    egui::RichText::new(format!("{}  ({})", entry.content, entry.timestamp))
                        .size(12.0)
                        .italics()
                        .color(notice_color(level, dark)),
                );
            });
        }
        ChatRole::User | ChatRole::Assistant => {
            let is_user = entry.role == ChatRole::User;
            let fill = match (is_user, dark) {
                (true, true) => egui::Color32::from_rgb(40, 62, 90),
                (true, false) => egui::Color32::from_rgb(215, 230, 248),
                (false, true) => egui::Color32::from_rgb(48, 48, 56),
                (false, false) => egui::Color32::from_rgb(235, 235, 240),
            };
            let base = if dark {
                egui::Color32::from_rgb(228, 228, 234)
            } else {
                egui::Color32::from_rgb(30, 30, 36)
            };

            egui::Frame::none()
                .fill(fill)
                .rounding(egui::Rounding::same(10.0))
                .inner_margin(egui::Margin::same(10.0))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(
                            egui::RichText::new(if is_user { "You" } else { "Tutor" })
                                .strong()
                                .size(12.0)
                                .color(base),
                        );
                        ui.label(
                            egui::RichText::new(&entry.timestamp)
                                .size(11.0)
                                .weak(),
                        );
                    });
                    if entry.content.is_empty() {
                        // Streamed message awaiting its first chunk.
                        ui.label(egui::RichText::new("...").weak());
                    } else {
                        markdown::render_markdown(ui, &entry.content, base);
                    }
                    if let Some(line) = &entry.settings_line {
                        ui.add_space(2.0);
                        ui.label(egui::RichText::new(line).size(11.0).weak());
                    }
                });
        }
    }
}

fn notice_color(level: NoticeLevel, dark: bool) -> egui::Color32 {
    match (level, dark) {
        (NoticeLevel::Info, true) => egui::Color32::from_rgb(150, 170, 200),
        (NoticeLevel::Info, false) => egui::Color32::from_rgb(90, 110, 140),
        (NoticeLevel::Success, true) => egui::Color32::from_rgb(130, 190, 130),
        (NoticeLevel::Success, false) => egui::Color32::from_rgb(60, 130, 60),
        (NoticeLevel::Warning, true) => egui::Color32::from_rgb(220, 180, 100),
        (NoticeLevel::Warning, false) => egui::Color32::from_rgb(170, 120, 40),
        (NoticeLevel::Error, true) => egui::Color32::from_rgb(230, 130, 130),
        (NoticeLevel::Error, false) => egui::Color32::from_rgb(180, 60, 60),
    }
}
