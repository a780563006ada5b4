//! Error types for the homework-helper-core library.
//!
//! The variants follow the three user-facing failure modes of the helper:
//! reading or decoding an image, talking to the Gemini API, and the UI shell
//! around them. A crop without a selection is not an error at all.

use thiserror::Error;

/// Errors that can occur within the homework-helper-core library.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Screen capture operation failed.
    #[error("Screen capture failed: {0}")]
    ScreenCapture(String),

    /// Requested screen/monitor index was not found.
    #[error("Screen not found: index {0}")]
    ScreenNotFound(usize),

    /// The image could not be decoded, cropped or encoded.
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// The crop selection has zero width or height.
    #[error("Selection area is empty or invalid")]
    EmptySelection,

    /// General Gemini API error.
    #[error("Gemini API error: {0}")]
    GeminiApi(String),

    /// Rate limited by the Gemini API.
    #[error("Rate limited by Gemini API, please retry later")]
    RateLimited,

    /// UI-related errors (rendering, window management).
    #[error("UI error: {0}")]
    Ui(String),

    /// Reading an image file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base64 payload could not be decoded.
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a screen capture error with the given message.
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::ScreenCapture(msg.into())
    }

    /// Creates an image processing error with the given message.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::ImageProcessing(msg.into())
    }

    /// Creates a Gemini API error with the given message.
    ///
    /// Messages that look like an HTTP 429 are folded into [`AppError::RateLimited`].
    pub fn gemini(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.contains("429") || msg.contains("RESOURCE_EXHAUSTED") {
            Self::RateLimited
        } else {
            Self::GeminiApi(msg)
        }
    }

    /// Creates a UI error with the given message.
    pub fn ui(msg: impl Into<String>) -> Self {
        Self::Ui(msg.into())
    }

    /// True for failures that happen while reading or decoding a picked image.
    ///
    /// These abort the crop flow with an alert and never reach the history.
    pub fn is_image_read_failure(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ImageProcessing(_) | Self::ScreenCapture(_))
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_errors_become_rate_limited() {
        let err = AppError::gemini("status 429: RESOURCE_EXHAUSTED");
        assert!(matches!(err, AppError::RateLimited));

        let err = AppError::gemini("connection reset");
        assert!(matches!(err, AppError::GeminiApi(_)));
    }

    #[test]
    fn read_failures_are_classified() {
        let io = AppError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io.is_image_read_failure());
        assert!(AppError::image("bad header").is_image_read_failure());
        assert!(!AppError::RateLimited.is_image_read_failure());
    }
}
