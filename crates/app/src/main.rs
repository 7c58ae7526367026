use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use parking_lot::Mutex;

use session::StatusKind;

mod chat_view;
mod config;
mod image_panel;
mod markdown;
mod settings_panel;
mod types;
mod workers;

use types::{AppState, AppTab, StatusLine};

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 780.0])
            .with_min_inner_size([800.0, 600.0]),
        vsync: true,
        ..Default::default()
    };
    eframe::run_native(
        "Tutor Desk",
        options,
        Box::new(|_cc| {
            Box::new(TutorDeskApp {
                state: Arc::new(Mutex::new(AppState::new())),
            })
        }),
    )
}

struct TutorDeskApp {
    state: Arc<Mutex<AppState>>,
}

impl eframe::App for TutorDeskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut s = self.state.lock();

        // Poll background channels (non-blocking).
        s.poll_socket();
        s.poll_image_fetch();

        // The socket worker produces events at any time; keep polling at a
        // gentle cadence even when the UI is idle.
        ctx.request_repaint_after(Duration::from_millis(150));

        if s.config.dark_mode {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }
        let dark = s.config.dark_mode;

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.heading("Tutor Desk");
                ui.separator();

                if ui
                    .selectable_label(s.current_tab == AppTab::TextTutor, "💬 AI Tutor")
                    .clicked()
                {
                    s.current_tab = AppTab::TextTutor;
                }
                let image_tab = ui.add_enabled(
                    s.image.enabled,
                    egui::SelectableLabel::new(
                        s.current_tab == AppTab::ImageAnalyzer,
                        "🖼 Image Analyzer",
                    ),
                );
                if image_tab.clicked() {
                    s.current_tab = AppTab::ImageAnalyzer;
                }
                if !s.image.enabled {
                    image_tab.on_disabled_hover_text("Image analysis unavailable - text-only mode");
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let mut dark_mode = s.config.dark_mode;
                    if ui.checkbox(&mut dark_mode, "Dark").changed() {
                        s.config.dark_mode = dark_mode;
                        config::save(&s.config);
                    }
                    ui.separator();
                    status_indicator(ui, &s.status);
                });
            });
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| match s.current_tab {
            AppTab::TextTutor => chat_view::show(ui, &mut s, dark),
            AppTab::ImageAnalyzer => image_panel::show(ui, &mut s, dark),
        });
    }
}

fn status_indicator(ui: &mut egui::Ui, status: &StatusLine) {
    ui.label(egui::RichText::new(&status.text).size(13.0));
    let color = match status.kind {
        StatusKind::Connecting => egui::Color32::from_rgb(220, 180, 80),
        StatusKind::Online => egui::Color32::from_rgb(90, 180, 90),
        StatusKind::Error => egui::Color32::from_rgb(210, 80, 80),
    };
    ui.label(egui::RichText::new("●").size(14.0).color(color));
}
