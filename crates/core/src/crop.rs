//! Crop rectangles and the initial crop proposal.
//!
//! A [`CropRect`] can be expressed in pixels or in percent of the image it
//! belongs to. The crop editor works in displayed pixels, the rasterizer in
//! natural pixels, and [`centered_crop`] proposes its initial selection in
//! percent so it survives any later resize of the widget.

use serde::{Deserialize, Serialize};

/// Share of the constraining dimension covered by the initial crop.
pub const INITIAL_COVERAGE: f32 = 0.9;

/// Unit of a [`CropRect`]'s geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CropUnit {
    /// Absolute pixels.
    Pixels,
    /// Percent (0..=100) of the image dimensions.
    Percent,
}

/// A user-selected sub-region of an image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub unit: CropUnit,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    pub fn pixels(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { unit: CropUnit::Pixels, x, y, width, height }
    }

    pub fn percent(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { unit: CropUnit::Percent, x, y, width, height }
    }

    /// Converts to absolute pixels of an image sized `width` x `height`.
    pub fn to_pixels(self, width: f32, height: f32) -> Self {
        match self.unit {
            CropUnit::Pixels => self,
            CropUnit::Percent => Self::pixels(
                self.x / 100.0 * width,
                self.y / 100.0 * height,
                self.width / 100.0 * width,
                self.height / 100.0 * height,
            ),
        }
    }

    /// Converts to percent of an image sized `width` x `height`.
    pub fn to_percent(self, width: f32, height: f32) -> Self {
        match self.unit {
            CropUnit::Percent => self,
            CropUnit::Pixels => Self::percent(
                self.x / width * 100.0,
                self.y / height * 100.0,
                self.width / width * 100.0,
                self.height / height * 100.0,
            ),
        }
    }

    /// Multiplies the geometry, e.g. to go from displayed to natural pixels.
    pub fn scaled(self, scale_x: f32, scale_y: f32) -> Self {
        Self {
            unit: self.unit,
            x: self.x * scale_x,
            y: self.y * scale_y,
            width: self.width * scale_x,
            height: self.height * scale_y,
        }
    }

    /// Clamps a pixel rectangle into `[0, width] x [0, height]`.
    pub fn clamp_to(self, width: f32, height: f32) -> Self {
        let px = self.to_pixels(width, height);
        let x = px.x.clamp(0.0, width);
        let y = px.y.clamp(0.0, height);
        let right = (px.x + px.width).clamp(x, width);
        let bottom = (px.y + px.height).clamp(y, height);
        Self::pixels(x, y, right - x, bottom - y)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// True when the rectangle lies inside an image sized `width` x `height`.
    pub fn fits_within(&self, width: f32, height: f32) -> bool {
        const EPS: f32 = 1e-3;
        let px = self.to_pixels(width, height);
        px.x >= -EPS
            && px.y >= -EPS
            && px.x + px.width <= width + EPS
            && px.y + px.height <= height + EPS
    }
}

/// Aspect-ratio presets offered by the crop editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    Free,
    Square,
    Landscape4x3,
    Portrait3x4,
    Wide16x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Free,
        AspectRatio::Square,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait3x4,
        AspectRatio::Wide16x9,
    ];

    /// Width divided by height, `None` for freeform.
    pub fn value(self) -> Option<f32> {
        match self {
            AspectRatio::Free => None,
            AspectRatio::Square => Some(1.0),
            AspectRatio::Landscape4x3 => Some(4.0 / 3.0),
            AspectRatio::Portrait3x4 => Some(3.0 / 4.0),
            AspectRatio::Wide16x9 => Some(16.0 / 9.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Free => "Free",
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Wide16x9 => "16:9",
        }
    }
}

/// Proposes the initial, centered crop for a freshly loaded image.
///
/// The rectangle spans 90% of the image width. With an aspect ratio the
/// height follows from it, and both sides shrink together when that height
/// would exceed 90% of the image height. Without one the crop is 90% x 90%.
/// The result is in [`CropUnit::Percent`].
pub fn centered_crop(natural_width: u32, natural_height: u32, aspect: Option<f32>) -> CropRect {
    let w = natural_width.max(1) as f32;
    let h = natural_height.max(1) as f32;

    let (crop_w, crop_h) = match aspect.filter(|a| a.is_finite() && *a > 0.0) {
        None => (w * INITIAL_COVERAGE, h * INITIAL_COVERAGE),
        Some(aspect) => {
            let mut crop_w = w * INITIAL_COVERAGE;
            let mut crop_h = crop_w / aspect;
            let max_h = h * INITIAL_COVERAGE;
            if crop_h > max_h {
                crop_h = max_h;
                crop_w = crop_h * aspect;
            }
            (crop_w, crop_h)
        }
    };

    CropRect::pixels((w - crop_w) / 2.0, (h - crop_h) / 2.0, crop_w, crop_h).to_percent(w, h)
}
