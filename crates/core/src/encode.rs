//! Image loading and transport encoding.
//!
//! Gemini accepts images as inline base64 blobs tagged with a MIME type.
//! [`EncodedImage`] is that pair; it is built once per confirmed crop and
//! travels with the outgoing message.

use crate::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// MIME type used for rasterized crops.
pub const CROP_MIME_TYPE: &str = "image/jpeg";

/// Base64 payload plus its MIME type, ready to be sent as an inline data part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: String,
}

impl EncodedImage {
    /// Decodes the payload back into the original bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(BASE64.decode(&self.data)?)
    }

    /// Size of the original bytes, without decoding.
    pub fn byte_len(&self) -> usize {
        let padding = self.data.bytes().rev().take_while(|b| *b == b'=').count();
        ((self.data.len() / 4) * 3).saturating_sub(padding)
    }
}

/// Encodes a raw blob as-is.
pub fn encode_bytes(bytes: &[u8], mime_type: impl Into<String>) -> EncodedImage {
    EncodedImage {
        data: BASE64.encode(bytes),
        mime_type: mime_type.into(),
    }
}

/// Reads an image file and encodes its bytes untouched.
///
/// The MIME type is sniffed from the content, falling back to the extension.
///
/// # Errors
///
/// [`AppError::Io`] if the file cannot be read, [`AppError::ImageProcessing`]
/// if it is not a recognizable image.
pub fn read_and_encode(path: impl AsRef<Path>) -> Result<EncodedImage> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let format = image::guess_format(&bytes)
        .or_else(|_| ImageFormat::from_path(path))
        .map_err(|e| AppError::image(format!("Unrecognized image {}: {}", path.display(), e)))?;
    log::debug!("read {} bytes of {:?} from {}", bytes.len(), format, path.display());
    Ok(encode_bytes(&bytes, format.to_mime_type()))
}

/// Encodes a rasterized image as JPEG.
///
/// JPEG carries no alpha channel, so the image is flattened to RGB first.
pub fn encode_image(image: &DynamicImage) -> Result<EncodedImage> {
    let mut buffer: Vec<u8> = Vec::new();
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());

    rgb.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
        .map_err(|e| AppError::image(format!("Failed to encode image: {}", e)))?;

    log::debug!(
        "encoded {}x{} crop into {} bytes",
        image.width(),
        image.height(),
        buffer.len()
    );
    Ok(encode_bytes(&buffer, CROP_MIME_TYPE))
}

/// Loads and decodes an image file for the crop editor.
pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let path = path.as_ref();
    let reader = ImageReader::open(path)?
        .with_guessed_format()?;
    reader
        .decode()
        .map_err(|e| AppError::image(format!("Failed to decode {}: {}", path.display(), e)))
}

/// Decodes an in-memory image, e.g. one dropped onto the window as bytes.
pub fn load_image_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| AppError::image(format!("Failed to decode image: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Write;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 128])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn base64_round_trip() {
        let bytes = b"\x00\x01\xfe\xffhomework";
        let encoded = encode_bytes(bytes, "application/octet-stream");
        assert_eq!(encoded.decode().unwrap(), bytes);
        assert_eq!(encoded.byte_len(), bytes.len());
    }

    #[test]
    fn byte_len_of_malformed_payload_does_not_underflow() {
        let short = EncodedImage {
            data: "=".to_string(),
            mime_type: CROP_MIME_TYPE.to_string(),
        };
        assert_eq!(short.byte_len(), 0);
        assert!(short.decode().is_err());
    }

    #[test]
    fn read_and_encode_sniffs_mime() {
        let mut file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        let bytes = png_bytes();
        file.write_all(&bytes).unwrap();

        let encoded = read_and_encode(file.path()).unwrap();
        assert_eq!(encoded.mime_type, "image/png");
        assert_eq!(encoded.decode().unwrap(), bytes);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_and_encode(dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
        assert!(err.is_image_read_failure());
    }

    #[test]
    fn garbage_does_not_decode() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"definitely not a png").unwrap();
        let err = load_image(file.path()).unwrap_err();
        assert!(err.is_image_read_failure());
    }

    #[test]
    fn crops_are_jpeg_even_with_alpha() {
        let img = load_image_from_bytes(&png_bytes()).unwrap();
        let encoded = encode_image(&img).unwrap();
        assert_eq!(encoded.mime_type, "image/jpeg");

        let decoded = load_image_from_bytes(&encoded.decode().unwrap()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }
}
