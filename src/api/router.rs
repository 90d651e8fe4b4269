//! Session API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Room for multipart framing on top of the largest accepted document.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build the session API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let body_limit = usize::try_from(core.settings().max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let ctx = ApiContext::new(core);

    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/protocol", post(endpoints::protocol::upload))
        .route(
            "/template",
            post(endpoints::template::upload)
                .get(endpoints::template::summary)
                .delete(endpoints::template::clear),
        )
        .route(
            "/fields",
            get(endpoints::fields::list).put(endpoints::fields::update),
        )
        .route("/render", post(endpoints::render::generate))
        .route("/log", get(endpoints::session::log))
        .route("/reset", post(endpoints::session::reset))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .nest("/api", routes)
        .layer(CorsLayer::permissive())
}
