//! Rendering helpers: crop overlay and answer formatting.

use crate::markdown::{self, Block, Span};
use eframe::egui;

/// Dims everything in `image_rect` except the selection.
///
/// # Arguments
/// * `painter` - The egui painter to draw with
/// * `image_rect` - Where the image is drawn, in screen coordinates
/// * `selection_rect` - The selected area to keep clear, in screen coordinates
/// * `alpha` - Darkness level (0-255, higher = darker)
pub fn draw_selection_overlay(
    painter: &egui::Painter,
    image_rect: egui::Rect,
    selection_rect: egui::Rect,
    alpha: u8,
) {
    let color = egui::Color32::from_black_alpha(alpha);
    let sel = selection_rect.intersect(image_rect);

    let bands = [
        // above
        egui::Rect::from_min_max(image_rect.min, egui::pos2(image_rect.max.x, sel.min.y)),
        // below
        egui::Rect::from_min_max(egui::pos2(image_rect.min.x, sel.max.y), image_rect.max),
        // left
        egui::Rect::from_min_max(egui::pos2(image_rect.min.x, sel.min.y), egui::pos2(sel.min.x, sel.max.y)),
        // right
        egui::Rect::from_min_max(egui::pos2(sel.max.x, sel.min.y), egui::pos2(image_rect.max.x, sel.max.y)),
    ];

    for band in bands.into_iter().filter(|b| b.is_positive()) {
        painter.rect_filled(band, 0.0, color);
    }
}

/// Draws a border around the selection rectangle.
pub fn draw_selection_border(
    painter: &egui::Painter,
    selection_rect: egui::Rect,
    stroke_width: f32,
    color: egui::Color32,
) {
    painter.rect_stroke(
        selection_rect,
        0.0,
        egui::Stroke::new(stroke_width, color),
        egui::StrokeKind::Middle,
    );
}

/// Renders answer text with the restricted markdown rules.
pub fn show_markdown(ui: &mut egui::Ui, text: &str) {
    for block in markdown::parse(text) {
        match block {
            Block::Heading { level, spans } => {
                let size = match level {
                    1 => 22.0,
                    2 => 19.0,
                    _ => 16.0,
                };
                show_spans(ui, &spans, Some(size));
            }
            Block::Bullet(spans) => {
                ui.horizontal_wrapped(|ui| {
                    ui.label("•");
                    add_spans(ui, &spans, None);
                });
            }
            Block::Spacer => ui.add_space(6.0),
            Block::Paragraph(spans) => show_spans(ui, &spans, None),
        }
    }
}

fn show_spans(ui: &mut egui::Ui, spans: &[Span], heading_size: Option<f32>) {
    ui.horizontal_wrapped(|ui| add_spans(ui, spans, heading_size));
}

fn add_spans(ui: &mut egui::Ui, spans: &[Span], heading_size: Option<f32>) {
    ui.spacing_mut().item_spacing.x = 0.0;
    for span in spans {
        let text = match span {
            Span::Text(t) => egui::RichText::new(t),
            Span::Bold(t) => egui::RichText::new(t).strong(),
            Span::Code(t) => egui::RichText::new(t).code(),
        };
        let text = match heading_size {
            Some(size) => text.size(size).strong(),
            None => text,
        };
        ui.label(text);
    }
}
