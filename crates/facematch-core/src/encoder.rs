//! Boundary to the external face detection + encoding model.

use crate::types::FaceEncoding;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("No face detected in the image")]
    NoFace,
    #[error("Multiple faces detected. Please use an image with only one face.")]
    MultipleFaces,
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("no face encoder is configured")]
    Unavailable,
}

/// Produces a face encoding from a decoded image.
///
/// Implementations must fail with [`EncodingError::MultipleFaces`] rather
/// than pick one face when several are present. Errors are terminal for
/// the request; callers never retry.
pub trait FaceEncoder: Send + Sync {
    fn encode(&self, image: &DynamicImage) -> Result<FaceEncoding, EncodingError>;
}
