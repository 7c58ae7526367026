//! Image analyzer panel: load a picture from disk or URL, ask a question
//! about it, show the results.

use anyhow::Result;
use eframe::egui;

use session::NoticeLevel;

use crate::markdown;
use crate::types::{AnalysisEntry, AppState};

const EXAMPLE_IMAGES: &[(&str, &str)] = &[
    (
        "Cell diagram",
        "https://upload.wikimedia.org/wikipedia/commons/1/11/Animal_Cell.svg.png",
    ),
    (
        "World map",
        "https://upload.wikimedia.org/wikipedia/commons/8/80/World_map.png",
    ),
];

pub fn show(ui: &mut egui::Ui, state: &mut AppState, dark: bool) {
    if !state.image.enabled {
        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new("Image analysis unavailable - text-only mode")
                    .size(15.0)
                    .weak(),
            );
        });
        return;
    }

    upload_preview_texture(ui.ctx(), state);

    if state.image.loaded.is_none() {
        ui.group(|ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(12.0);
                ui.label(egui::RichText::new("📷 Load an image to analyze").size(15.0));
                ui.add_space(6.0);
                if ui.button("Choose image file...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Images", &["png", "jpg", "jpeg", "gif", "webp", "bmp"])
                        .pick_file()
                    {
                        state.load_image_file(&path);
                    }
                }
                ui.add_space(12.0);
            });
        });
        ui.add_space(6.0);

        ui.horizontal(|ui| {
            let response = ui.add_sized(
                [ui.available_width() - 70.0, 28.0],
                egui::TextEdit::singleline(&mut state.image.url_input)
                    .hint_text("...or paste an image URL"),
            );
            let entered = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.add_sized([60.0, 28.0], egui::Button::new("Load")).clicked() || entered {
                state.load_image_from_url();
            }
        });

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Examples:").size(12.0).weak());
            for (label, url) in EXAMPLE_IMAGES {
                if ui.small_button(*label).clicked() {
                    state.image.url_input = url.to_string();
                    state.load_image_from_url();
                }
            }
        });

        if state.image.fetch_rx.is_some() {
            ui.label(egui::RichText::new("Loading image...").weak().italics());
        }
    } else {
        ui.horizontal(|ui| {
            if let Some(texture) = &state.image.texture {
                let size = scaled_size(texture.size_vec2(), 300.0);
                ui.image((texture.id(), size));
            }
            if ui.button("✖ Remove").clicked() {
                state.remove_image();
            }
        });
    }

    ui.add_space(8.0);
    ui.label("Question about the image:");
    ui.add(
        egui::TextEdit::multiline(&mut state.image.question_input)
            .desired_rows(2)
            .desired_width(f32::INFINITY)
            .hint_text("What would you like to know about this image?"),
    );
    ui.add_space(4.0);

    let label = if state.image.analyzing {
        "⏳ Analyzing..."
    } else {
        "🔍 Analyze Image"
    };
    if ui
        .add_enabled(state.can_analyze(), egui::Button::new(label))
        .clicked()
    {
        state.analyze_image();
    }

    ui.add_space(10.0);
    ui.separator();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for entry in &state.image.results {
                ui.add_space(6.0);
                render_result(ui, entry, dark);
            }
        });
}

/// Decode the loaded image into a texture once per load.
fn upload_preview_texture(ctx: &egui::Context, state: &mut AppState) {
    if state.image.texture.is_some() {
        return;
    }
    let decoded = state
        .image
        .loaded
        .as_ref()
        .map(|loaded| decode_preview(ctx, loaded.bytes()));
    match decoded {
        Some(Ok(texture)) => state.image.texture = Some(texture),
        Some(Err(e)) => {
            state.remove_image();
            state.push_system(NoticeLevel::Error, format!("Could not decode image: {e}"));
        }
        None => {}
    }
}

fn decode_preview(ctx: &egui::Context, bytes: &[u8]) -> Result<egui::TextureHandle> {
    let decoded = image::load_from_memory(bytes)?.to_rgba8();
    let size = [decoded.width() as usize, decoded.height() as usize];
    let color = egui::ColorImage::from_rgba_unmultiplied(size, decoded.as_raw());
    Ok(ctx.load_texture("image-preview", color, egui::TextureOptions::LINEAR))
}

fn scaled_size(size: egui::Vec2, max_edge: f32) -> egui::Vec2 {
    let scale = (max_edge / size.x.max(size.y)).min(1.0);
    size * scale
}

fn render_result(ui: &mut egui::Ui, entry: &AnalysisEntry, dark: bool) {
    let base = if dark {
        egui::Color32::from_rgb(228, 228, 234)
    } else {
        egui::Color32::from_rgb(30, 30, 36)
    };
    let answer_color = if entry.is_error {
        if dark {
            egui::Color32::from_rgb(230, 130, 130)
        } else {
            egui::Color32::from_rgb(180, 60, 60)
        }
    } else {
        base
    };

    egui::Frame::none()
        .fill(if dark {
            egui::Color32::from_rgb(48, 48, 56)
        } else {
            egui::Color32::from_rgb(235, 235, 240)
        })
        .rounding(egui::Rounding::same(10.0))
        .inner_margin(egui::Margin::same(10.0))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new("🔍 Analysis Result")
                        .strong()
                        .size(13.0)
                        .color(base),
                );
                ui.label(egui::RichText::new(&entry.timestamp).size(11.0).weak());
            });
            if !entry.question.is_empty() {
                ui.label(
                    egui::RichText::new(format!("Question: {}", entry.question))
                        .size(12.0)
                        .weak(),
                );
            }
            ui.add_space(2.0);
            markdown::render_markdown(ui, &entry.answer, answer_color);
        });
}
