use axum::{
    extract::{Extension, Request},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Name of the header carrying the authenticated caller.
#[derive(Debug, Clone)]
pub struct IdentityHeader(pub String);

/// The caller as asserted by the fronting proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Attach the caller's identity when present. Reads pass without one;
/// anything that changes state is refused.
pub async fn identity_middleware(
    Extension(header): Extension<IdentityHeader>,
    mut request: Request,
    next: Next,
) -> Response {
    let actor = request
        .headers()
        .get(header.0.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| Actor(v.to_string()));

    match actor {
        Some(actor) => {
            tracing::Span::current().record("actor", actor.as_str());
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        None if is_read(request.method()) => next.run(request).await,
        None => (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"}))).into_response(),
    }
}

fn is_read(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
