use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::engine::error::EngineError;
use crate::engine::extinguisher::{
    DispatchStatus, ExtinguisherPatch, ExtinguisherView, FireExtinguisher, NewExtinguisher,
};
use crate::engine::Engine;

#[derive(Deserialize)]
pub struct DispatchStatusRequest {
    pub status: DispatchStatus,
}

fn record(action: &'static str, id: Option<Uuid>) {
    let span = tracing::Span::current();
    span.record("asset", "fire_extinguisher").record("action", action);
    if let Some(id) = id {
        span.record("asset_id", tracing::field::display(id));
    }
}

fn views(engine: &Engine, extinguishers: Vec<FireExtinguisher>) -> Vec<ExtinguisherView> {
    extinguishers
        .into_iter()
        .map(|e| engine.extinguisher_view(e))
        .collect()
}

// GET /api/fire-extinguishers
pub async fn list_extinguishers(Extension(engine): Extension<Arc<Engine>>) -> impl IntoResponse {
    let all = engine.list_extinguishers().await;
    Json(views(&engine, all))
}

// GET /api/fire-extinguishers/dispatched
pub async fn list_dispatched(Extension(engine): Extension<Arc<Engine>>) -> impl IntoResponse {
    let out = engine.list_dispatched().await;
    Json(views(&engine, out))
}

// POST /api/fire-extinguishers
pub async fn create_extinguisher(
    Extension(engine): Extension<Arc<Engine>>,
    Json(payload): Json<NewExtinguisher>,
) -> Result<impl IntoResponse, EngineError> {
    record("create", None);
    let created = engine.create_extinguisher(payload).await?;
    tracing::Span::current().record("business_event", "Fire extinguisher registered");
    Ok((StatusCode::CREATED, Json(engine.extinguisher_view(created))))
}

// GET /api/fire-extinguishers/:id
pub async fn get_extinguisher(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let found = engine.get_extinguisher(id).await?;
    Ok(Json(engine.extinguisher_view(found)))
}

// PATCH /api/fire-extinguishers/:id
pub async fn update_extinguisher(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ExtinguisherPatch>,
) -> Result<impl IntoResponse, EngineError> {
    record("update", Some(id));
    let updated = engine.update_extinguisher(id, patch).await?;
    Ok(Json(engine.extinguisher_view(updated)))
}

// DELETE /api/fire-extinguishers/:id
pub async fn delete_extinguisher(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    record("delete", Some(id));
    engine.delete_extinguisher(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/fire-extinguishers/:id/trigger
pub async fn trigger_extinguisher(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    record("trigger", Some(id));
    let (extinguisher, alert) = engine.trigger_extinguisher(id).await?;
    tracing::Span::current().record("business_event", "Fire extinguisher discharged");
    Ok(Json(json!({
        "extinguisher": engine.extinguisher_view(extinguisher),
        "alert": alert,
    })))
}

// POST /api/fire-extinguishers/:id/refill
pub async fn refill_extinguisher(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    record("refill", Some(id));
    let refilled = engine.refill_extinguisher(id).await?;
    Ok(Json(engine.extinguisher_view(refilled)))
}

// POST /api/fire-extinguishers/:id/pressure-test
pub async fn pressure_test_extinguisher(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    record("pressure_test", Some(id));
    let tested = engine.pressure_test_extinguisher(id).await?;
    Ok(Json(engine.extinguisher_view(tested)))
}

// POST /api/fire-extinguishers/:id/dispatch
pub async fn dispatch_extinguisher(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    record("dispatch", Some(id));
    let dispatched = engine.dispatch_extinguisher(id).await?;
    tracing::Span::current().record("business_event", "Fire extinguisher sent for service");
    Ok(Json(engine.extinguisher_view(dispatched)))
}

// PUT /api/fire-extinguishers/:id/dispatch-status
pub async fn set_dispatch_status(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DispatchStatusRequest>,
) -> Result<impl IntoResponse, EngineError> {
    record("advance_dispatch", Some(id));
    let updated = match payload.status {
        DispatchStatus::Dispatched => engine.dispatch_extinguisher(id).await?,
        target => engine.advance_dispatch(id, target).await?,
    };
    Ok(Json(engine.extinguisher_view(updated)))
}

// POST /api/fire-extinguishers/:id/receive
pub async fn receive_extinguisher(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    record("receive", Some(id));
    let received = engine.receive_extinguisher(id).await?;
    tracing::Span::current().record("business_event", "Fire extinguisher back from service");
    Ok(Json(engine.extinguisher_view(received)))
}
