//! HTTP surface over the engine.
//!
//! Reads are open. Every route that changes state needs the identity header
//! set by the fronting proxy (see [`middleware::identity_middleware`]).

pub mod alerts;
pub mod dashboard;
pub mod detectors;
pub mod error;
pub mod extinguishers;
pub mod maintenance;
pub mod middleware;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Extension, Router,
};

use crate::engine::Engine;
use middleware::IdentityHeader;

async fn health_check() -> &'static str {
    "OK"
}

pub fn router(engine: Arc<Engine>, identity_header: &str) -> Router {
    let detector_routes = Router::new()
        .route(
            "/",
            get(detectors::list_detectors).post(detectors::create_detector),
        )
        .route(
            "/:id",
            get(detectors::get_detector)
                .patch(detectors::update_detector)
                .delete(detectors::delete_detector),
        )
        .route("/:id/trigger", post(detectors::trigger_detector))
        .route("/:id/reset", post(detectors::reset_detector));

    let extinguisher_routes = Router::new()
        .route(
            "/",
            get(extinguishers::list_extinguishers).post(extinguishers::create_extinguisher),
        )
        .route("/dispatched", get(extinguishers::list_dispatched))
        .route(
            "/:id",
            get(extinguishers::get_extinguisher)
                .patch(extinguishers::update_extinguisher)
                .delete(extinguishers::delete_extinguisher),
        )
        .route("/:id/trigger", post(extinguishers::trigger_extinguisher))
        .route("/:id/refill", post(extinguishers::refill_extinguisher))
        .route(
            "/:id/pressure-test",
            post(extinguishers::pressure_test_extinguisher),
        )
        .route("/:id/dispatch", post(extinguishers::dispatch_extinguisher))
        .route(
            "/:id/dispatch-status",
            put(extinguishers::set_dispatch_status),
        )
        .route("/:id/receive", post(extinguishers::receive_extinguisher));

    let maintenance_routes = Router::new()
        .route("/", get(maintenance::list_items).post(maintenance::create_item))
        .route(
            "/:id",
            get(maintenance::get_item)
                .patch(maintenance::update_item)
                .delete(maintenance::delete_item),
        )
        .route("/:id/notes", post(maintenance::add_note));

    let alert_routes = Router::new()
        .route("/", get(alerts::list_alerts))
        .route("/:id", get(alerts::get_alert))
        .route("/:id/acknowledge", post(alerts::acknowledge_alert));

    let api_routes = Router::new()
        .nest("/smoke-detectors", detector_routes)
        .nest("/fire-extinguishers", extinguisher_routes)
        .nest("/maintenance", maintenance_routes)
        .nest("/alerts", alert_routes)
        .route("/dashboard", get(dashboard::dashboard))
        .route("/revision", get(dashboard::revision))
        .route_layer(axum::middleware::from_fn(middleware::identity_middleware));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(Extension(engine))
        .layer(Extension(IdentityHeader(identity_header.to_ascii_lowercase())))
}
