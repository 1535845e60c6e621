//! Image payload decoding for webcam captures.
//!
//! Browsers send `canvas.toDataURL()` output, so the base64 body may carry a
//! `data:image/jpeg;base64,` header.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unrecognized image data: {0}")]
    Image(#[from] image::ImageError),
}

/// Strip an optional data-URL header and return the base64 body.
pub fn strip_data_url(raw: &str) -> &str {
    match raw.split_once(',') {
        Some((_, body)) => body,
        None => raw,
    }
}

/// Decode a base64 (optionally data-URL) image into pixels.
pub fn decode_image(raw: &str) -> Result<DynamicImage, PayloadError> {
    let body = strip_data_url(raw.trim());
    let bytes = STANDARD.decode(body.trim())?;
    Ok(image::load_from_memory(&bytes)?)
}

#[cfg(test)]
pub(crate) fn encode_test_png(width: u32, height: u32) -> String {
    let img = DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode png");
    STANDARD.encode(buf.into_inner())
}
