//! HTTP transport.
//!
//! API endpoints:
//! - POST   /register_face         {name, image | encoding}
//! - POST   /recognize_face        {image | encoding}
//! - GET    /get_registered_faces
//! - DELETE /delete_face/{name}
//! - GET    /status

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::service::{FaceInput, FaceService, MessageResponse, RecognizeResponse, ServiceError};

type AppState = Arc<FaceService>;

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    encoding: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct RecognizeRequest {
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    encoding: Option<Vec<f32>>,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidInput(_) | ServiceError::EncodingFailure(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::AlreadyRegistered(_) => StatusCode::CONFLICT,
            ServiceError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        (status, Json(MessageResponse::failure(self.to_string()))).into_response()
    }
}

/// Build the router with permissive CORS for the browser client.
pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/register_face", post(register_face))
        .route("/recognize_face", post(recognize_face))
        .route("/get_registered_faces", get(get_registered_faces))
        .route("/delete_face/{name}", delete(delete_face))
        .route("/status", get(status))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    addr: &str,
    service: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr: SocketAddr = addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Pick the face from a request body; an image takes precedence.
fn face_input(image: Option<String>, encoding: Option<Vec<f32>>) -> Option<FaceInput> {
    match (image, encoding) {
        (Some(image), _) if !image.trim().is_empty() => Some(FaceInput::Image(image)),
        (_, Some(encoding)) => Some(FaceInput::Encoding(encoding)),
        _ => None,
    }
}

fn bad_body(rejection: JsonRejection) -> ServiceError {
    ServiceError::InvalidInput(format!("Invalid request body: {}", rejection.body_text()))
}

async fn register_face(
    State(service): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ServiceError> {
    let Json(req) = body.map_err(bad_body)?;
    let name = req.name.unwrap_or_default();
    let face = match face_input(req.image, req.encoding) {
        Some(face) if !name.trim().is_empty() => face,
        _ => return Err(ServiceError::InvalidInput("Name and image are required".into())),
    };
    Ok(Json(service.register(&name, face).await?))
}

async fn recognize_face(
    State(service): State<AppState>,
    body: Result<Json<RecognizeRequest>, JsonRejection>,
) -> Result<Json<RecognizeResponse>, ServiceError> {
    let Json(req) = body.map_err(bad_body)?;
    let face = face_input(req.image, req.encoding)
        .ok_or_else(|| ServiceError::InvalidInput("Image is required".into()))?;
    Ok(Json(service.recognize(face).await?))
}

async fn get_registered_faces(State(service): State<AppState>) -> impl IntoResponse {
    Json(service.list_faces())
}

async fn delete_face(
    State(service): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, ServiceError> {
    Ok(Json(service.delete_face(&name).await?))
}

async fn status(State(service): State<AppState>) -> impl IntoResponse {
    Json(service.status())
}
