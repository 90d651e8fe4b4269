//! Access logging middleware.
//!
//! Every request is traced. State-changing requests and failures also land
//! in the session activity log so the user sees them next to extraction
//! and render events.

use std::time::Instant;

use axum::extract::OriginalUri;
use axum::http::{Method, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::ApiContext;
use crate::core_state::LogSource;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    // Nested routers see a stripped URI; log the path the client sent.
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let ctx = req.extensions().get::<ApiContext>().cloned();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::debug!(%method, path, status = status.as_u16(), elapsed_ms, "API request");

    if let Some(ctx) = ctx {
        if method != Method::GET || status.is_client_error() || status.is_server_error() {
            ctx.core.log().push(
                LogSource::Api,
                format!("{method} {path} -> {}", status.as_u16()),
            );
        }
    }

    response
}
