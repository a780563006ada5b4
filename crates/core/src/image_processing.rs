//! Crop rasterization.
//!
//! The crop editor shows the picked image scaled into the window, so the user
//! selects a region in displayed (logical) pixels while the image itself has
//! its own natural resolution. This module maps the selection back to natural
//! pixels and renders it at `natural resolution x pixel density`, the way a
//! HiDPI canvas would.
//!
//! # Coordinate Mapping
//!
//! ```text
//! scale_x = natural_width / displayed_width
//! region  = crop * scale, edges rounded to whole natural pixels
//! output  = ceil(region_width * pixel_density) x ceil(region_height * pixel_density)
//! ```

use crate::crop::CropRect;
use crate::error::{AppError, Result};
use image::DynamicImage;
use image::imageops::FilterType;

/// Slack absorbed before rounding output sizes up, so `800.0000001` stays 800.
const CEIL_EPSILON: f64 = 1e-4;

/// Everything the rasterizer needs besides the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterRequest {
    /// Width of the image as displayed, in logical pixels.
    pub display_width: f32,
    /// Height of the image as displayed, in logical pixels.
    pub display_height: f32,
    /// Confirmed selection in displayed space, `None` when the user never
    /// confirmed one.
    pub selection: Option<CropRect>,
    /// Physical pixels per logical pixel of the output device.
    pub pixel_density: f32,
}

impl RasterRequest {
    /// A request where the image is displayed at its natural size.
    pub fn natural(image: &DynamicImage, selection: Option<CropRect>) -> Self {
        Self {
            display_width: image.width() as f32,
            display_height: image.height() as f32,
            selection,
            pixel_density: 1.0,
        }
    }
}

/// Image processing utilities for the crop workflow.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Renders the selected region of `original` at native resolution.
    ///
    /// Without a confirmed selection the full original image is returned
    /// unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EmptySelection`] if the selection has zero area
    /// after clamping to the image, and [`AppError::ImageProcessing`] if the
    /// display size is not positive.
    pub fn rasterize(original: &DynamicImage, request: &RasterRequest) -> Result<DynamicImage> {
        let Some(selection) = request.selection else {
            log::debug!(
                "no confirmed crop, using full {}x{} image",
                original.width(),
                original.height()
            );
            return Ok(original.clone());
        };

        let density = Self::density(request);
        let (src_x, src_y, src_w, src_h) = Self::natural_region(original, request, selection)?;
        let (out_w, out_h) = Self::surface_size(src_w, src_h, density);

        let cropped = original.crop_imm(src_x, src_y, src_w, src_h);
        log::debug!(
            "cropped {src_w}x{src_h} at ({src_x},{src_y}), output surface {out_w}x{out_h} (density {density})"
        );

        if (src_w, src_h) == (out_w, out_h) {
            return Ok(cropped);
        }
        Ok(cropped.resize_exact(out_w, out_h, FilterType::Lanczos3))
    }

    /// Pixel size of the surface [`rasterize`](Self::rasterize) would produce.
    ///
    /// Returns the original size when there is no selection.
    pub fn output_dimensions(original: &DynamicImage, request: &RasterRequest) -> Result<(u32, u32)> {
        let Some(selection) = request.selection else {
            return Ok((original.width(), original.height()));
        };
        let (_, _, src_w, src_h) = Self::natural_region(original, request, selection)?;
        Ok(Self::surface_size(src_w, src_h, Self::density(request)))
    }

    /// Maps a displayed selection to a whole-pixel region of `original`.
    ///
    /// Edges are rounded to the nearest pixel once, so the region size and
    /// the output surface agree and a unit scale copies pixels untouched.
    fn natural_region(
        original: &DynamicImage,
        request: &RasterRequest,
        selection: CropRect,
    ) -> Result<(u32, u32, u32, u32)> {
        let (scale_x, scale_y) = Self::scale_factors(original, request)?;

        let displayed = selection.to_pixels(request.display_width, request.display_height);
        if displayed.is_empty() {
            return Err(AppError::EmptySelection);
        }

        // Transform displayed coordinates to natural image coordinates
        let natural = displayed
            .scaled(scale_x, scale_y)
            .clamp_to(original.width() as f32, original.height() as f32);
        if natural.is_empty() {
            return Err(AppError::EmptySelection);
        }

        let src_x = (natural.x.round() as u32).min(original.width());
        let src_y = (natural.y.round() as u32).min(original.height());
        let src_right = ((natural.x + natural.width).round() as u32).min(original.width());
        let src_bottom = ((natural.y + natural.height).round() as u32).min(original.height());
        let src_w = src_right.saturating_sub(src_x);
        let src_h = src_bottom.saturating_sub(src_y);
        if src_w == 0 || src_h == 0 {
            return Err(AppError::EmptySelection);
        }
        Ok((src_x, src_y, src_w, src_h))
    }

    /// Ratio of natural to displayed size on each axis.
    fn scale_factors(original: &DynamicImage, request: &RasterRequest) -> Result<(f32, f32)> {
        if !(request.display_width > 0.0 && request.display_height > 0.0) {
            return Err(AppError::image(format!(
                "Display size must be positive, got {}x{}",
                request.display_width, request.display_height
            )));
        }
        Ok((
            original.width() as f32 / request.display_width,
            original.height() as f32 / request.display_height,
        ))
    }

    fn density(request: &RasterRequest) -> f32 {
        if request.pixel_density.is_finite() && request.pixel_density > 0.0 {
            request.pixel_density
        } else {
            1.0
        }
    }

    fn surface_size(src_w: u32, src_h: u32, density: f32) -> (u32, u32) {
        let side = |v: u32| ((v as f64 * density as f64 - CEIL_EPSILON).ceil().max(1.0)) as u32;
        (side(src_w), side(src_h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    /// Red image with a blue block covering `[x0, x1) x [y0, y1)`.
    fn marked_image(w: u32, h: u32, block: (u32, u32, u32, u32)) -> DynamicImage {
        let (x0, y0, x1, y1) = block;
        let img = RgbaImage::from_fn(w, h, |x, y| {
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) { BLUE } else { RED }
        });
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn scaled_display_crop_keeps_native_resolution() {
        // 1200x800 shown at 600x400, crop (100,100,400,300) -> natural (200,200,800,600)
        let source = marked_image(1200, 800, (200, 200, 1000, 800));
        let request = RasterRequest {
            display_width: 600.0,
            display_height: 400.0,
            selection: Some(CropRect::pixels(100.0, 100.0, 400.0, 300.0)),
            pixel_density: 1.0,
        };

        let out = ImageProcessor::rasterize(&source, &request).unwrap();
        assert_eq!((out.width(), out.height()), (800, 600));

        let rgba = out.to_rgba8();
        for (x, y) in [(0, 0), (799, 0), (0, 599), (799, 599), (400, 300)] {
            assert_eq!(*rgba.get_pixel(x, y), BLUE, "pixel ({x},{y}) leaked outside the crop");
        }
    }

    #[test]
    fn pixel_density_multiplies_output() {
        let source = marked_image(120, 80, (0, 0, 120, 80));
        let request = RasterRequest {
            display_width: 60.0,
            display_height: 40.0,
            selection: Some(CropRect::pixels(10.0, 10.0, 40.0, 30.0)),
            pixel_density: 2.0,
        };
        assert_eq!(ImageProcessor::output_dimensions(&source, &request).unwrap(), (160, 120));
        let out = ImageProcessor::rasterize(&source, &request).unwrap();
        assert_eq!((out.width(), out.height()), (160, 120));
    }

    #[test]
    fn fractional_density_rounds_up() {
        let source = marked_image(100, 100, (0, 0, 0, 0));
        let request = RasterRequest {
            display_width: 100.0,
            display_height: 100.0,
            selection: Some(CropRect::pixels(0.0, 0.0, 33.0, 21.0)),
            pixel_density: 1.5,
        };
        let out = ImageProcessor::rasterize(&source, &request).unwrap();
        assert_eq!((out.width(), out.height()), (50, 32));
    }

    #[test]
    fn percent_selection_is_resolved_against_display() {
        let source = marked_image(400, 200, (0, 0, 0, 0));
        let request = RasterRequest {
            display_width: 200.0,
            display_height: 100.0,
            selection: Some(CropRect::percent(25.0, 25.0, 50.0, 50.0)),
            pixel_density: 1.0,
        };
        let out = ImageProcessor::rasterize(&source, &request).unwrap();
        assert_eq!((out.width(), out.height()), (200, 100));
    }

    #[test]
    fn missing_selection_falls_back_to_full_image() {
        let source = marked_image(30, 20, (5, 5, 10, 10));
        let request = RasterRequest::natural(&source, None);
        let out = ImageProcessor::rasterize(&source, &request).unwrap();
        assert_eq!(out.to_rgba8(), source.to_rgba8());
    }

    #[test]
    fn zero_area_selection_is_rejected() {
        let source = marked_image(30, 20, (0, 0, 0, 0));
        let request = RasterRequest::natural(&source, Some(CropRect::pixels(5.0, 5.0, 0.0, 10.0)));
        assert!(matches!(
            ImageProcessor::rasterize(&source, &request),
            Err(AppError::EmptySelection)
        ));

        let outside = RasterRequest::natural(&source, Some(CropRect::pixels(40.0, 5.0, 10.0, 10.0)));
        assert!(matches!(
            ImageProcessor::rasterize(&source, &outside),
            Err(AppError::EmptySelection)
        ));
    }

    #[test]
    fn overhanging_selection_is_clamped() {
        let source = marked_image(100, 100, (0, 0, 0, 0));
        let request = RasterRequest::natural(&source, Some(CropRect::pixels(80.0, 90.0, 50.0, 50.0)));
        let out = ImageProcessor::rasterize(&source, &request).unwrap();
        assert_eq!((out.width(), out.height()), (20, 10));
    }

    #[test]
    fn half_pixel_offset_copies_pixels_untouched() {
        // 1px black/white stripes, black on even columns
        let stripes = image::GrayImage::from_fn(100, 10, |x, _| {
            if x % 2 == 0 { image::Luma([0]) } else { image::Luma([255]) }
        });
        let source = DynamicImage::ImageLuma8(stripes);
        let request = RasterRequest::natural(&source, Some(CropRect::pixels(10.5, 0.0, 40.0, 10.0)));

        assert_eq!(ImageProcessor::output_dimensions(&source, &request).unwrap(), (40, 10));
        let out = ImageProcessor::rasterize(&source, &request).unwrap().to_luma8();
        assert_eq!((out.width(), out.height()), (40, 10));

        let expected = source.crop_imm(11, 0, 40, 10).to_luma8();
        assert_eq!(out, expected);
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn zero_display_size_is_an_error() {
        let source = marked_image(10, 10, (0, 0, 0, 0));
        let request = RasterRequest {
            display_width: 0.0,
            display_height: 10.0,
            selection: Some(CropRect::pixels(0.0, 0.0, 5.0, 5.0)),
            pixel_density: 1.0,
        };
        assert!(matches!(
            ImageProcessor::rasterize(&source, &request),
            Err(AppError::ImageProcessing(_))
        ));
    }
}
