//! The five settings selectors, each with a "Custom..." override.
//!
//! The token override is validated when its field loses focus; an invalid
//! value shows a warning and keeps focus pinned to the field so it cannot
//! silently ride along into a send.

use eframe::egui;

use session::resolver::{self, validate_custom_tokens, FieldChoice, CUSTOM};

use crate::types::AppState;

pub fn show(ui: &mut egui::Ui, state: &mut AppState) {
    ui.horizontal_wrapped(|ui| {
        dimension(
            ui,
            "Subject",
            "subject_select",
            &mut state.draft.subject,
            resolver::SUBJECTS,
        );
        dimension(
            ui,
            "Language",
            "language_select",
            &mut state.draft.language,
            resolver::LANGUAGES,
        );
        dimension(
            ui,
            "Level",
            "level_select",
            &mut state.draft.level,
            resolver::LEVELS,
        );
        dimension(
            ui,
            "Style",
            "style_select",
            &mut state.draft.response_style,
            resolver::STYLES,
        );
        token_dimension(ui, &mut state.draft.max_tokens, &mut state.token_field_error);
    });

    if let Some(error) = &state.token_field_error {
        ui.label(
            egui::RichText::new(error)
                .size(12.0)
                .color(egui::Color32::from_rgb(200, 80, 80)),
        );
    }
}

fn dimension(
    ui: &mut egui::Ui,
    label: &str,
    id: &str,
    choice: &mut FieldChoice,
    options: &[&str],
) {
    ui.label(label);
    let before = choice.selected.clone();

    egui::ComboBox::from_id_source(id)
        .selected_text(display_text(choice))
        .width(110.0)
        .show_ui(ui, |ui| {
            for option in options {
                ui.selectable_value(&mut choice.selected, option.to_string(), *option);
            }
            ui.selectable_value(&mut choice.selected, CUSTOM.to_string(), "Custom...");
        });

    if before != choice.selected && !choice.is_custom() {
        choice.custom_text.clear();
    }

    if choice.is_custom() {
        let response = ui.add(
            egui::TextEdit::singleline(&mut choice.custom_text)
                .hint_text("custom")
                .desired_width(110.0),
        );
        if before != choice.selected {
            response.request_focus();
        }
        if response.lost_focus() && choice.custom_text.trim().is_empty() {
            // Empty override: revert to the dimension's first option.
            choice.selected = options[0].to_string();
            choice.custom_text.clear();
        }
    }
    ui.add_space(10.0);
}

fn token_dimension(ui: &mut egui::Ui, choice: &mut FieldChoice, error: &mut Option<String>) {
    ui.label("Max tokens");
    let before = choice.selected.clone();

    egui::ComboBox::from_id_source("token_select")
        .selected_text(display_text(choice))
        .width(90.0)
        .show_ui(ui, |ui| {
            for option in resolver::TOKEN_PRESETS {
                ui.selectable_value(&mut choice.selected, option.to_string(), *option);
            }
            ui.selectable_value(&mut choice.selected, CUSTOM.to_string(), "Custom...");
        });

    if before != choice.selected && !choice.is_custom() {
        choice.custom_text.clear();
        *error = None;
    }

    if choice.is_custom() {
        let response = ui.add(
            egui::TextEdit::singleline(&mut choice.custom_text)
                .hint_text("50-2048")
                .desired_width(80.0),
        );
        if before != choice.selected {
            response.request_focus();
        }
        if response.lost_focus() {
            let text = choice.custom_text.trim().to_string();
            if text.is_empty() {
                choice.selected = resolver::TOKEN_PRESETS[0].to_string();
                choice.custom_text.clear();
                *error = None;
            } else {
                match validate_custom_tokens(&text) {
                    Ok(_) => *error = None,
                    Err(err) => {
                        // Block the focus loss: warn and put the cursor back.
                        *error = Some(err.message());
                        response.request_focus();
                    }
                }
            }
        }
    }
    ui.add_space(10.0);
}

fn display_text(choice: &FieldChoice) -> String {
    if choice.is_custom() {
        "Custom...".to_string()
    } else {
        choice.selected.clone()
    }
}
