use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};
use serde_json::json;

use crate::engine::Engine;

// GET /api/dashboard
pub async fn dashboard(Extension(engine): Extension<Arc<Engine>>) -> impl IntoResponse {
    Json(engine.dashboard().await)
}

// GET /api/revision
pub async fn revision(Extension(engine): Extension<Arc<Engine>>) -> impl IntoResponse {
    Json(json!({ "revision": engine.revision() }))
}
