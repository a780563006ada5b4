//! Where homework photos come from.
//!
//! A problem can be grabbed from the screen (the desktop stand-in for a
//! camera shot of a worksheet) or picked from disk. Both origins produce a
//! [`DynamicImage`] that goes through the same crop flow.
//!
//! ```ignore
//! use homework_helper_core::capture::{ImageOrigin, acquire};
//!
//! let photo = acquire(&ImageOrigin::File("worksheet.jpg".into()))?;
//! ```

use crate::encode::load_image;
use crate::error::{AppError, Result};
use image::DynamicImage;
use screenshots::Screen;
use std::path::PathBuf;

/// Source of the image attached to a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Capture the monitor with this zero-based index.
    Screen(usize),
    /// Load an image file.
    File(PathBuf),
}

/// Loads the image behind `origin`.
///
/// Failures here are read failures: the caller alerts the user and records
/// nothing in the conversation.
pub fn acquire(origin: &ImageOrigin) -> Result<DynamicImage> {
    match origin {
        ImageOrigin::Screen(index) => ScreenCapturer::new()?.capture_screen_by_index(*index),
        ImageOrigin::File(path) => {
            let image = load_image(path)?;
            log::info!("loaded {}x{} image from {}", image.width(), image.height(), path.display());
            Ok(image)
        }
    }
}

/// Screen capturer with multi-monitor support.
pub struct ScreenCapturer {
    screens: Vec<Screen>,
}

impl ScreenCapturer {
    /// Detects the available screens.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ScreenCapture`] if enumeration fails or no screen
    /// is detected.
    pub fn new() -> Result<Self> {
        let screens = Screen::all()
            .map_err(|e| AppError::capture(format!("Failed to enumerate screens: {}", e)))?;

        if screens.is_empty() {
            return Err(AppError::capture("No screens detected"));
        }

        Ok(Self { screens })
    }

    /// Human-readable description of each screen.
    pub fn list_screen(&self) -> Vec<String> {
        self.screens
            .iter()
            .enumerate()
            .map(|(i, s)| {
                format!(
                    "Monitor {}: {}x{} (scale: {})",
                    i, s.display_info.width, s.display_info.height, s.display_info.scale_factor
                )
            })
            .collect()
    }

    /// Captures a specific screen by its index.
    ///
    /// # Errors
    ///
    /// - [`AppError::ScreenNotFound`] if the index is out of bounds
    /// - [`AppError::ScreenCapture`] if the capture operation fails
    pub fn capture_screen_by_index(&self, index: usize) -> Result<DynamicImage> {
        let screen = self
            .screens
            .get(index)
            .ok_or(AppError::ScreenNotFound(index))?;

        let captured = screen
            .capture()
            .map_err(|e| AppError::capture(format!("Failed to capture screen: {}", e)))?;

        let (width, height) = (captured.width(), captured.height());
        let img_buffer = image::ImageBuffer::from_raw(width, height, captured.into_raw())
            .ok_or_else(|| AppError::capture("Failed to create image buffer"))?;

        log::info!("captured monitor {index} at {width}x{height}");
        Ok(DynamicImage::ImageRgba8(img_buffer))
    }

    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_origin_is_a_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let origin = ImageOrigin::File(dir.path().join("worksheet.png"));
        let err = acquire(&origin).unwrap_err();
        assert!(err.is_image_read_failure());
    }

    #[test]
    fn file_origin_loads_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worksheet.png");
        image::RgbImage::from_pixel(8, 6, image::Rgb([200, 200, 200]))
            .save(&path)
            .unwrap();

        let image = acquire(&ImageOrigin::File(path)).unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));
    }
}
