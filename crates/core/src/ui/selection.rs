//! Crop selection handling and coordinate mapping.
//!
//! The editor shows the image inside `image_rect` (screen coordinates). The
//! selection is kept relative to that rect, i.e. in displayed pixels, which
//! is exactly what the rasterizer expects.

use crate::crop::{CropRect, centered_crop};
use eframe::egui;

/// Minimum distance (in points) for a drag to count as a new selection.
pub const MIN_SELECTION_DISTANCE: f32 = 10.0;

/// Result of processing selection input events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionEvent {
    /// User started a new selection drag.
    Started,
    /// User is actively dragging.
    Dragging,
    /// User completed a valid selection.
    Completed,
    /// The drag was too small, the previous selection is kept.
    Cancelled,
    /// No selection event occurred.
    None,
}

/// Determines if a drag is far enough to be intentional.
pub fn is_valid_selection(start: egui::Pos2, end: egui::Pos2) -> bool {
    start.distance(end) > MIN_SELECTION_DISTANCE
}

/// Fits an `image_size` image into `available` keeping its aspect ratio.
///
/// Images are never scaled up past their natural size.
pub fn fit_image(image_size: egui::Vec2, available: egui::Vec2) -> egui::Vec2 {
    let scale = (available.x / image_size.x)
        .min(available.y / image_size.y)
        .min(1.0);
    image_size * scale
}

/// Maps a screen-space drag to a selection relative to `image_rect`.
///
/// With an aspect ratio the height follows the drag width.
pub fn drag_to_selection(
    start: egui::Pos2,
    end: egui::Pos2,
    image_rect: egui::Rect,
    aspect: Option<f32>,
) -> egui::Rect {
    let start = image_rect.clamp(start);
    let mut end = image_rect.clamp(end);

    if let Some(aspect) = aspect {
        let width = (end.x - start.x).abs();
        let dir_y = if end.y >= start.y { 1.0 } else { -1.0 };
        end.y = start.y + dir_y * width / aspect;
        end = image_rect.clamp(end);
        // Height hit the edge, shrink the width to match
        let height = (end.y - start.y).abs();
        let dir_x = if end.x >= start.x { 1.0 } else { -1.0 };
        end.x = start.x + dir_x * height * aspect;
    }

    egui::Rect::from_two_pos(start, end).translate(-image_rect.min.to_vec2())
}

/// The proposed selection for a freshly shown image, in displayed pixels.
pub fn initial_selection(natural: [u32; 2], displayed: egui::Vec2, aspect: Option<f32>) -> egui::Rect {
    let crop = centered_crop(natural[0], natural[1], aspect).to_pixels(displayed.x, displayed.y);
    egui::Rect::from_min_size(egui::pos2(crop.x, crop.y), egui::vec2(crop.width, crop.height))
}

/// Converts an editor selection into a displayed-space [`CropRect`].
pub fn to_crop_rect(selection: egui::Rect) -> CropRect {
    CropRect::pixels(selection.min.x, selection.min.y, selection.width(), selection.height())
}

/// Processes drag events over the image.
///
/// A new drag replaces the selection. Drags shorter than
/// [`MIN_SELECTION_DISTANCE`] restore the previous one.
pub fn process_drag_event(
    response: &egui::Response,
    image_rect: egui::Rect,
    aspect: Option<f32>,
    start: &mut Option<egui::Pos2>,
    selection: &mut Option<egui::Rect>,
    previous: &mut Option<egui::Rect>,
) -> SelectionEvent {
    if response.drag_started() {
        *start = response.interact_pointer_pos();
        *previous = *selection;
        return SelectionEvent::Started;
    }

    if response.dragged() {
        if let (Some(s), Some(pos)) = (*start, response.interact_pointer_pos()) {
            *selection = Some(drag_to_selection(s, pos, image_rect, aspect));
        }
        return SelectionEvent::Dragging;
    }

    if response.drag_stopped() {
        let end = response.interact_pointer_pos();
        let drag_start = start.take();
        if let (Some(s), Some(e)) = (drag_start, end) {
            if is_valid_selection(s, e) {
                *selection = Some(drag_to_selection(s, e, image_rect, aspect));
                return SelectionEvent::Completed;
            }
        }
        *selection = previous.take();
        return SelectionEvent::Cancelled;
    }

    SelectionEvent::None
}
