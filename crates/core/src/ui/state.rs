//! UI state types and event definitions.

use crate::crop::AspectRatio;
use crate::encode::EncodedImage;
use crate::error::AppError;
use eframe::egui;
use image::DynamicImage;

/// Events received from the background answer task.
///
/// These are sent through a channel from the async Gemini task to the UI
/// thread, which feeds them into the [`ChatSession`](crate::chat::ChatSession).
pub(crate) enum StreamEvent {
    /// A chunk of answer text arrived.
    Chunk(String),
    /// The request failed before or during streaming.
    Error(AppError),
    /// The stream has completed.
    Done,
}

/// A picked image waiting for the user to confirm a crop.
pub(crate) struct CropState {
    pub image: DynamicImage,
    /// Uploaded on the first frame the editor is shown.
    pub texture: Option<egui::TextureHandle>,
    pub aspect: AspectRatio,
    /// Drag start in screen coordinates.
    pub drag_start: Option<egui::Pos2>,
    /// Current selection, relative to the top-left of the displayed image.
    pub selection: Option<egui::Rect>,
    /// Selection before the current drag, restored if the drag is too short.
    pub previous_selection: Option<egui::Rect>,
    /// Size the image was last displayed at.
    pub display_size: Option<egui::Vec2>,
    /// Set when the proposed selection must be recomputed for the current layout.
    pub needs_initial_selection: bool,
}

impl CropState {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            texture: None,
            aspect: AspectRatio::Free,
            drag_start: None,
            selection: None,
            previous_selection: None,
            display_size: None,
            needs_initial_selection: true,
        }
    }
}

/// The crop waiting to be attached to the next question.
#[derive(Clone)]
pub(crate) struct PendingAttachment {
    pub encoded: EncodedImage,
    pub thumbnail: egui::TextureHandle,
    pub width: u32,
    pub height: u32,
}

/// Modal shown when an image cannot be read.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Alert {
    pub title: String,
    pub message: String,
}
