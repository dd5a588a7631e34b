use std::sync::Arc;

use axum::{routing::get, Router};
use safetrack_server::config::Config;
use safetrack_server::engine::Engine;
use safetrack_server::repository::{NoopRepository, Repository, SeaOrmRepository};
use safetrack_server::{api, migrator, seed};
use sea_orm::Database;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;
    safetrack_server::telemetry::init_telemetry(&config.telemetry)?;

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    let repository: Arc<dyn Repository> = match &config.database_url {
        Some(url) => {
            let db = Database::connect(url).await?;

            use sea_orm_migration::MigratorTrait;
            migrator::Migrator::up(&db, None).await?;
            Arc::new(SeaOrmRepository::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; state will not survive a restart");
            Arc::new(NoopRepository)
        }
    };

    let engine = Arc::new(Engine::new(config.engine.clone()).with_repository(repository));
    engine.hydrate().await?;

    if config.seed_sample_data {
        seed::seed_sample_data(&engine).await?;
    }

    safetrack_server::metrics::init_metrics(&engine);

    let app = app(&config, engine, prometheus_layer, metric_handle)?;

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn app(
    config: &Config,
    engine: Arc<Engine>,
    prometheus_layer: axum_prometheus::PrometheusMetricLayer<'static>,
    metric_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> Result<Router, BoxError> {
    let mut cors = tower_http::cors::CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderName::from_bytes(config.identity_header.as_bytes())?,
        ]);
    if let Some(origin) = &config.cors_origin {
        cors = cors.allow_origin(origin.parse::<axum::http::HeaderValue>()?);
    }

    let router = api::router(engine, &config.identity_header)
        .layer(prometheus_layer)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    // Span name: "METHOD /matched/path"
                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };

                    let client_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .or_else(|| {
                            request
                                .headers()
                                .get("x-real-ip")
                                .and_then(|v| v.to_str().ok())
                        })
                        .unwrap_or("unknown");

                    // Handlers fill in the empty fields
                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        client_ip = client_ip,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        asset = tracing::field::Empty,
                        asset_id = tracing::field::Empty,
                        action = tracing::field::Empty,
                        actor = tracing::field::Empty,
                        business_event = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {
                    // Only the completion line is logged
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));
                        tracing::info!("request completed");
                    },
                ),
        )
        .layer(cors)
        .route("/metrics", get(|| async move { metric_handle.render() }));
    Ok(router)
}
