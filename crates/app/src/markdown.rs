//! Minimal markdown rendering for chat bubbles.
//!
//! Covers the subset the tutor model actually produces: `**bold**`,
//! `*italic*`, `` `inline code` `` and plain newlines. Parsing is split
//! from drawing so the span logic can be tested without a UI.

use eframe::egui;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Plain(String),
    Bold(String),
    Italic(String),
    Code(String),
}

/// Split one line into styled spans. Unterminated markers are treated as
/// literal text.
pub fn parse_line(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    fn flush(spans: &mut Vec<Span>, plain: &mut String) {
        if !plain.is_empty() {
            spans.push(Span::Plain(std::mem::take(plain)));
        }
    }

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("**") {
            if let Some(end) = after.find("**") {
                flush(&mut spans, &mut plain);
                spans.push(Span::Bold(after[..end].to_string()));
                rest = &after[end + 2..];
                continue;
            }
        } else if let Some(after) = rest.strip_prefix('*') {
            if let Some(end) = after.find('*') {
                flush(&mut spans, &mut plain);
                spans.push(Span::Italic(after[..end].to_string()));
                rest = &after[end + 1..];
                continue;
            }
        } else if let Some(after) = rest.strip_prefix('`') {
            if let Some(end) = after.find('`') {
                flush(&mut spans, &mut plain);
                spans.push(Span::Code(after[..end].to_string()));
                rest = &after[end + 1..];
                continue;
            }
        }
        // No marker starts here; consume one character as plain text.
        let ch = rest.chars().next().unwrap();
        plain.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    flush(&mut spans, &mut plain);
    spans
}

/// Render markdown text into an egui region.
pub fn render_markdown(ui: &mut egui::Ui, text: &str, base_color: egui::Color32) {
    let code_bg = if base_color.r() > 128 {
        egui::Color32::from_rgb(60, 60, 70)
    } else {
        egui::Color32::from_rgb(228, 230, 235)
    };
    let base_size = 14.0;

    for line in text.lines() {
        if line.trim().is_empty() {
            ui.add_space(6.0);
            continue;
        }
        ui.horizontal_wrapped(|ui| {
            ui.spacing_mut().item_spacing.x = 0.0;
            for span in parse_line(line) {
                match span {
                    Span::Plain(text) => {
                        ui.label(
                            egui::RichText::new(text)
                                .size(base_size)
                                .color(base_color),
                        );
                    }
                    Span::Bold(text) => {
                        ui.label(
                            egui::RichText::new(text)
                                .size(base_size)
                                .strong()
                                .color(base_color),
                        );
                    }
                    Span::Italic(text) => {
                        ui.label(
                            egui::RichText::new(text)
                                .size(base_size)
                                .italics()
                                .color(base_color),
                        );
                    }
                    Span::Code(text) => {
                        egui::Frame::none()
                            .fill(code_bg)
                            .rounding(egui::Rounding::same(3.0))
                            .inner_margin(egui::Margin::symmetric(4.0, 1.0))
                            .show(ui, |ui| {
                                ui.label(
                                    egui::RichText::new(text)
                                        .size(base_size)
                                        .monospace()
                                        .color(base_color),
                                );
                            });
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_one_span() {
        assert_eq!(
            parse_line("just words"),
            vec![Span::Plain("just words".into())]
        );
    }

    #[test]
    fn test_bold_and_italic() {
        assert_eq!(
            parse_line("a **bold** and *slanted* word"),
            vec![
                Span::Plain("a ".into()),
                Span::Bold("bold".into()),
                Span::Plain(" and ".into()),
                Span::Italic("slanted".into()),
                Span::Plain(" word".into()),
            ]
        );
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(
            parse_line("run `cargo doc` now"),
            vec![
                Span::Plain("run ".into()),
                Span::Code("cargo doc".into()),
                Span::Plain(" now".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_markers_stay_literal() {
        assert_eq!(
            parse_line("**not closed"),
            vec![Span::Plain("**not closed".into())]
        );
        assert_eq!(
            parse_line("`half open"),
            vec![Span::Plain("`half open".into())]
        );
    }
}
