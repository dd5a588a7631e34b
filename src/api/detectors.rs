use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::engine::detector::{DetectorPatch, NewDetector};
use crate::engine::error::EngineError;
use crate::engine::Engine;

fn record(action: &'static str, id: Option<Uuid>) {
    let span = tracing::Span::current();
    span.record("asset", "smoke_detector").record("action", action);
    if let Some(id) = id {
        span.record("asset_id", tracing::field::display(id));
    }
}

// GET /api/smoke-detectors
pub async fn list_detectors(Extension(engine): Extension<Arc<Engine>>) -> impl IntoResponse {
    Json(engine.list_detectors().await)
}

// POST /api/smoke-detectors
pub async fn create_detector(
    Extension(engine): Extension<Arc<Engine>>,
    Json(payload): Json<NewDetector>,
) -> Result<impl IntoResponse, EngineError> {
    record("create", None);
    let detector = engine.create_detector(payload).await?;
    tracing::Span::current().record("business_event", "Smoke detector registered");
    Ok((StatusCode::CREATED, Json(detector)))
}

// GET /api/smoke-detectors/:id
pub async fn get_detector(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    Ok(Json(engine.get_detector(id).await?))
}

// PATCH /api/smoke-detectors/:id
pub async fn update_detector(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<DetectorPatch>,
) -> Result<impl IntoResponse, EngineError> {
    record("update", Some(id));
    Ok(Json(engine.update_detector(id, patch).await?))
}

// DELETE /api/smoke-detectors/:id
pub async fn delete_detector(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    record("delete", Some(id));
    engine.delete_detector(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/smoke-detectors/:id/trigger
pub async fn trigger_detector(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    record("trigger", Some(id));
    let (detector, alert) = engine.trigger_detector(id).await?;
    tracing::Span::current().record("business_event", "Smoke detector triggered");
    Ok(Json(json!({ "detector": detector, "alert": alert })))
}

// POST /api/smoke-detectors/:id/reset
pub async fn reset_detector(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    record("reset", Some(id));
    Ok(Json(engine.reset_detector(id).await?))
}
