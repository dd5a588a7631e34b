use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::middleware::Actor;
use crate::engine::error::EngineError;
use crate::engine::maintenance::{MaintenancePatch, NewMaintenanceItem};
use crate::engine::Engine;

#[derive(Deserialize)]
pub struct AddNoteRequest {
    pub text: String,
}

fn record(action: &'static str, id: Option<Uuid>) {
    let span = tracing::Span::current();
    span.record("asset", "maintenance_item").record("action", action);
    if let Some(id) = id {
        span.record("asset_id", tracing::field::display(id));
    }
}

// GET /api/maintenance
pub async fn list_items(Extension(engine): Extension<Arc<Engine>>) -> impl IntoResponse {
    let items: Vec<_> = engine
        .list_maintenance_items()
        .await
        .into_iter()
        .map(|item| engine.maintenance_view(item))
        .collect();
    Json(items)
}

// POST /api/maintenance
pub async fn create_item(
    Extension(engine): Extension<Arc<Engine>>,
    Json(payload): Json<NewMaintenanceItem>,
) -> Result<impl IntoResponse, EngineError> {
    record("create", None);
    let item = engine.create_maintenance_item(payload).await?;
    Ok((StatusCode::CREATED, Json(engine.maintenance_view(item))))
}

// GET /api/maintenance/:id
pub async fn get_item(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let item = engine.get_maintenance_item(id).await?;
    Ok(Json(engine.maintenance_view(item)))
}

// PATCH /api/maintenance/:id
pub async fn update_item(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<MaintenancePatch>,
) -> Result<impl IntoResponse, EngineError> {
    record("update", Some(id));
    let item = engine.update_maintenance_item(id, patch).await?;
    Ok(Json(engine.maintenance_view(item)))
}

// DELETE /api/maintenance/:id
pub async fn delete_item(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    record("delete", Some(id));
    engine.delete_maintenance_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/maintenance/:id/notes
pub async fn add_note(
    Extension(engine): Extension<Arc<Engine>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddNoteRequest>,
) -> Result<impl IntoResponse, EngineError> {
    record("add_note", Some(id));
    let note = engine.add_note(id, payload.text, actor.0).await?;
    Ok((StatusCode::CREATED, Json(note)))
}
