//! Homework Helper Core Library
//!
//! Ask a homework question, optionally with a cropped photo of the problem,
//! and get a step-by-step answer from Google's Gemini.
//!
//! # Overview
//!
//! - **Image origins**: screen capture or image files via [`capture`]
//! - **Cropping**: initial crop proposal in [`crop`], rasterization in [`image_processing`]
//! - **Encoding**: base64 inline payloads via [`encode`]
//! - **Conversation**: the send/answer state machine in [`chat`]
//! - **AI Integration**: Gemini requests and streaming via [`gemini`]
//! - **Formatting**: the restricted answer markdown in [`markdown`]
//! - **User Interface**: the egui window in [`ui`]
//!
//! # Quick Start
//!
//! ```ignore
//! use homework_helper_core::HomeworkHelper;
//!
//! let helper = HomeworkHelper::new()?;
//! let answer = helper.solve("What is the derivative of x^2?", None).await?;
//! println!("{answer}");
//! ```

pub mod capture;
pub mod chat;
pub mod config;
pub mod crop;
pub mod encode;
pub mod error;
pub mod gemini;
pub mod image_processing;
pub mod markdown;
pub mod prompt;
pub mod ui;

// Re-export primary types for convenience
pub use chat::{ChatSession, Message, Role, TutorBackend};
pub use config::Config;
pub use crop::{CropRect, centered_crop};
pub use encode::EncodedImage;
pub use error::{AppError, Result};
pub use gemini::GeminiClient;
pub use image_processing::{ImageProcessor, RasterRequest};

use capture::ImageOrigin;

/// Facade over configuration, image preparation and the Gemini client.
pub struct HomeworkHelper {
    config: Config,
}

impl HomeworkHelper {
    /// Creates a helper configured from the environment (including `.env`).
    pub fn new() -> Result<Self> {
        Ok(Self { config: Config::load()? })
    }

    /// Creates a helper with an explicit configuration.
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Loads an image from `origin`, crops it and encodes it for sending.
    ///
    /// `selection` is in natural pixels of the loaded image. `None` sends
    /// the full image.
    pub fn prepare_image(&self, origin: &ImageOrigin, selection: Option<CropRect>) -> Result<EncodedImage> {
        let image = capture::acquire(origin)?;
        let request = RasterRequest::natural(&image, selection);
        let cropped = ImageProcessor::rasterize(&image, &request)?;
        encode::encode_image(&cropped)
    }

    /// Asks one question and returns the answer text.
    ///
    /// This is a single attempt. Failures are returned, not retried.
    pub async fn solve(&self, question: &str, image: Option<EncodedImage>) -> Result<String> {
        let request = prompt::TutorRequest::new(&self.config, question, image)
            .ok_or_else(|| AppError::config("Nothing to ask: provide a question or an image"))?;
        GeminiClient::new(&self.config)?.generate(request).await
    }

    /// Opens the desktop window.
    pub fn run_interactive(&self, initial_image: Option<image::DynamicImage>) -> Result<()> {
        ui::run_helper_ui(self.config.clone(), initial_image)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

/// Loads `.env` files if present.
///
/// Call this once at application startup.
pub fn init() {
    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_image_crops_and_encodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worksheet.png");
        image::RgbImage::from_pixel(40, 30, image::Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();

        let helper = HomeworkHelper::with_config(Config::builder().with_api_key("key").build().unwrap());
        let encoded = helper
            .prepare_image(&ImageOrigin::File(path), Some(CropRect::pixels(10.0, 5.0, 20.0, 10.0)))
            .unwrap();

        assert_eq!(encoded.mime_type, "image/jpeg");
        let decoded = image::load_from_memory(&encoded.decode().unwrap()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 10));
    }

    #[tokio::test]
    async fn solve_rejects_empty_question() {
        let helper = HomeworkHelper::with_config(Config::builder().with_api_key("key").build().unwrap());
        assert!(matches!(helper.solve("  ", None).await, Err(AppError::Config(_))));
    }
}
