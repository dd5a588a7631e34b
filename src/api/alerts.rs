use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::middleware::Actor;
use crate::engine::error::EngineError;
use crate::engine::Engine;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Deserialize)]
pub struct AlertQuery {
    pub limit: Option<usize>,
    #[serde(default)]
    pub unacknowledged: bool,
}

// GET /api/alerts
pub async fn list_alerts(
    Extension(engine): Extension<Arc<Engine>>,
    Query(query): Query<AlertQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    Json(engine.list_alerts(limit, query.unacknowledged).await)
}

// GET /api/alerts/:id
pub async fn get_alert(
    Extension(engine): Extension<Arc<Engine>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let alert = engine.get_alert(id).await?;
    let source = engine.alert_source(id).await?;
    Ok(Json(json!({ "alert": alert, "source": source })))
}

// POST /api/alerts/:id/acknowledge
pub async fn acknowledge_alert(
    Extension(engine): Extension<Arc<Engine>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    tracing::Span::current()
        .record("asset", "alert")
        .record("action", "acknowledge")
        .record("asset_id", tracing::field::display(id));
    let alert = engine.acknowledge_alert(id, actor.as_str()).await?;
    tracing::Span::current().record("business_event", "Alert acknowledged");
    Ok(Json(alert))
}
