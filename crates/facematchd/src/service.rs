//! Request/response operations exposed to API clients.
//!
//! Transport-agnostic: `http` maps routes onto these methods and turns
//! [`ServiceError`] into status codes.

use crate::payload::{self, PayloadError};
use facematch_core::{
    EncodingError, EncodingStore, EuclideanMatcher, FaceEncoder, FaceEncoding, MatchError,
    MatchResult, Matcher, StoreError,
};
use image::DynamicImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// A face as submitted by a client.
#[derive(Debug, Clone)]
pub enum FaceInput {
    /// Base64 image (optionally a data URL), run through the face encoder.
    Image(String),
    /// Encoding already computed client-side.
    Encoding(Vec<f32>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyRegistered(String),
    #[error("{0}")]
    EncodingFailure(String),
    #[error("{0}")]
    StorageUnavailable(String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidInput(msg) => Self::InvalidInput(msg),
            StoreError::NotFound(_) => Self::NotFound("Face not found".into()),
            StoreError::AlreadyRegistered(_) => {
                Self::AlreadyRegistered("Name already registered".into())
            }
            StoreError::StorageUnavailable(msg) => {
                Self::StorageUnavailable(format!("Storage unavailable: {msg}"))
            }
        }
    }
}

impl From<MatchError> for ServiceError {
    fn from(e: MatchError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

impl From<EncodingError> for ServiceError {
    fn from(e: EncodingError) -> Self {
        Self::EncodingFailure(e.to_string())
    }
}

impl From<PayloadError> for ServiceError {
    fn from(e: PayloadError) -> Self {
        tracing::debug!(error = %e, "rejected image payload");
        Self::InvalidInput("Invalid image format".into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizeResponse {
    pub success: bool,
    pub recognized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Present only when `recognized` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub message: String,
}

impl RecognizeResponse {
    fn not_recognized(message: &str) -> Self {
        Self {
            success: true,
            recognized: false,
            name: None,
            confidence: None,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacesResponse {
    pub success: bool,
    pub faces: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub faces: usize,
    pub threshold: f32,
    pub distance_scale: f32,
    pub encoding_dim: usize,
    pub backend: String,
    pub image_encoder: bool,
}

pub struct FaceService {
    store: Arc<EncodingStore>,
    matcher: EuclideanMatcher,
    threshold: f32,
    encoder: Option<Arc<dyn FaceEncoder>>,
    /// Where registration images are kept as `{name}.jpg`.
    image_dir: Option<PathBuf>,
}

impl FaceService {
    pub fn new(store: Arc<EncodingStore>, matcher: EuclideanMatcher, threshold: f32) -> Self {
        Self {
            store,
            matcher,
            threshold,
            encoder: None,
            image_dir: None,
        }
    }

    /// Attach the model that turns images into encodings.
    ///
    /// Reserved for builds that bundle a face model.
    #[allow(dead_code)]
    pub fn with_encoder(mut self, encoder: Arc<dyn FaceEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Keep a JPEG copy of each image-based registration under `dir`.
    pub fn with_image_dir(mut self, dir: PathBuf) -> Self {
        self.image_dir = Some(dir);
        self
    }

    /// Register `face` under `name`.
    ///
    /// The registration image, if any, is saved after the record commits;
    /// failing to save it is logged and does not fail the registration.
    pub async fn register(
        &self,
        name: &str,
        face: FaceInput,
    ) -> Result<MessageResponse, ServiceError> {
        tracing::info!(name, "register requested");
        let (encoding, image) = self.encode(face).await?;
        self.store.register(name, encoding).await?;

        if let (Some(dir), Some(image)) = (&self.image_dir, image) {
            save_face_image(image_path(dir, name.trim()), image).await;
        }
        Ok(MessageResponse::ok(format!(
            "Face registered successfully for {}",
            name.trim()
        )))
    }

    /// Find the registered face closest to `face`.
    pub async fn recognize(&self, face: FaceInput) -> Result<RecognizeResponse, ServiceError> {
        let (probe, _) = self.encode(face).await?;
        if probe.len() != self.store.dimension() {
            return Err(ServiceError::InvalidInput(format!(
                "encoding has {} dimensions, expected {}",
                probe.len(),
                self.store.dimension()
            )));
        }

        let records = self.store.all_records();
        if records.is_empty() {
            tracing::info!("recognize requested with no registered faces");
            return Ok(RecognizeResponse::not_recognized("No registered faces found"));
        }

        match self.matcher.compare(&probe, &records, self.threshold)? {
            MatchResult::Match {
                name,
                distance,
                confidence,
            } => {
                tracing::info!(name = %name, distance, confidence, "face recognized");
                Ok(RecognizeResponse {
                    success: true,
                    recognized: true,
                    message: format!("Face recognized as {name}"),
                    name: Some(name),
                    confidence: Some(confidence),
                })
            }
            MatchResult::NoMatch => {
                tracing::info!("face not recognized");
                Ok(RecognizeResponse::not_recognized("Face not recognized"))
            }
        }
    }

    pub fn list_faces(&self) -> FacesResponse {
        let faces = self.store.list_names();
        FacesResponse {
            success: true,
            count: faces.len(),
            faces,
        }
    }

    pub async fn delete_face(&self, name: &str) -> Result<MessageResponse, ServiceError> {
        tracing::info!(name, "delete requested");
        self.store.delete(name).await?;

        if let Some(dir) = &self.image_dir {
            let path = image_path(dir, name.trim());
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "removed face image"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove face image")
                }
            }
        }
        Ok(MessageResponse::ok(format!(
            "Face {} deleted successfully",
            name.trim()
        )))
    }

    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            version: env!("CARGO_PKG_VERSION"),
            faces: self.store.len(),
            threshold: self.threshold,
            distance_scale: self.matcher.distance_scale(),
            encoding_dim: self.store.dimension(),
            backend: self.store.backend_description(),
            image_encoder: self.encoder.is_some(),
        }
    }

    /// Turn `face` into an encoding; image inputs also hand back the
    /// decoded pixels.
    async fn encode(
        &self,
        face: FaceInput,
    ) -> Result<(FaceEncoding, Option<DynamicImage>), ServiceError> {
        match face {
            FaceInput::Encoding(values) => Ok((FaceEncoding::new(values), None)),
            FaceInput::Image(raw) => {
                let encoder = self.encoder.clone();
                // Decoding and inference are CPU-bound.
                tokio::task::spawn_blocking(
                    move || -> Result<(FaceEncoding, Option<DynamicImage>), ServiceError> {
                        let image = payload::decode_image(&raw)?;
                        let encoder = encoder.ok_or(EncodingError::Unavailable)?;
                        let encoding = encoder.encode(&image)?;
                        Ok((encoding, Some(image)))
                    },
                )
                .await
                .map_err(|e| ServiceError::EncodingFailure(format!("encoder task failed: {e}")))?
            }
        }
    }
}

/// `{dir}/{name}.jpg`, with path separators and a leading dot in `name`
/// replaced so the file always lands directly inside `dir`.
fn image_path(dir: &Path, name: &str) -> PathBuf {
    let mut stem: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    if stem.starts_with('.') {
        stem.replace_range(..1, "_");
    }
    dir.join(format!("{stem}.jpg"))
}

async fn save_face_image(path: PathBuf, image: DynamicImage) {
    let target = path.clone();
    let saved = tokio::task::spawn_blocking(move || -> Result<(), String> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        // JPEG has no alpha channel.
        image.to_rgb8().save(&target).map_err(|e| e.to_string())
    })
    .await;

    match saved {
        Ok(Ok(())) => tracing::debug!(path = %path.display(), "saved face image"),
        Ok(Err(e)) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to save face image")
        }
        Err(e) => tracing::warn!(error = %e, "face image task failed"),
    }
}
