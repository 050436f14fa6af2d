//! HTTP boundary.
//!
//! | Route | Method | Body |
//! |-------|--------|------|
//! | `/healthz` | GET | `{"ok": true, "cache": {...}}` |
//! | `/explain` | POST | JSON [`ExplainResponse`], `X-Cache` header |
//! | `/explain-stream` | POST | `text/plain` chunked explanation |
//!
//! Both explanation routes skip the cache when the body sets `regenerate`,
//! the `x-bypass-cache` header is truthy, or the `bypass` query parameter is
//! truthy (`1`, `true`, `yes`).
//!
//! [`ExplainResponse`]: crate::types::ExplainResponse

mod routes;

pub use routes::{bypass_requested, BypassQuery, BYPASS_HEADER};

use crate::service::ExplainService;
use axum::http::{HeaderName, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ExplainService>,
}

impl AppState {
    pub fn new(service: Arc<ExplainService>) -> Self {
        Self { service }
    }
}

fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let origin = match frontend_url.map(|url| url.trim_end_matches('/').parse::<HeaderValue>()) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(e)) => {
            warn!(error = %e, "invalid FRONTEND_URL; allowing any origin");
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static("x-cache"),
            HeaderName::from_static("x-cache-key"),
            HeaderName::from_static("x-bypass"),
        ])
}

/// Build the router. CORS admits `frontend_url` only, or any origin when unset.
pub fn build_router(service: Arc<ExplainService>, frontend_url: Option<&str>) -> Router {
    let state = Arc::new(AppState::new(service));
    Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/explain", post(routes::explain))
        .route("/explain-stream", post(routes::explain_stream))
        .layer(cors_layer(frontend_url))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `bind` until `shutdown` resolves.
pub async fn start_server<F>(
    bind: &str,
    service: Arc<ExplainService>,
    frontend_url: Option<&str>,
    shutdown: F,
) -> crate::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(service, frontend_url);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "explanation server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("explanation server stopped");
    Ok(())
}
