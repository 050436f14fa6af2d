//! Route handlers.

use super::AppState;
use crate::types::{ExplainRequest, ExplanationChunk};
use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderName};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;

/// Request header that skips the cache when truthy.
pub const BYPASS_HEADER: &str = "x-bypass-cache";

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
const X_CACHE_KEY: HeaderName = HeaderName::from_static("x-cache-key");
const X_BYPASS: HeaderName = HeaderName::from_static("x-bypass");
const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

#[derive(Debug, Default, Deserialize)]
pub struct BypassQuery {
    pub bypass: Option<String>,
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Whether the caller asked to skip the cache via header or query parameter.
pub fn bypass_requested(headers: &HeaderMap, query: &BypassQuery) -> bool {
    let header = headers
        .get(BYPASS_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(truthy);
    header || query.bypass.as_deref().is_some_and(truthy)
}

/// GET /healthz
pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "cache": state.service.cache().stats(),
    }))
}

/// POST /explain
pub async fn explain(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BypassQuery>,
    Json(req): Json<ExplainRequest>,
) -> Response {
    let bypass = bypass_requested(&headers, &query);
    let explanation = state.service.explain(&req, bypass).await;
    (
        [(X_CACHE, explanation.status.as_header_value())],
        Json(explanation.response),
    )
        .into_response()
}

/// POST /explain-stream
pub async fn explain_stream(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BypassQuery>,
    Json(req): Json<ExplainRequest>,
) -> Response {
    let bypass = bypass_requested(&headers, &query);
    let stream = state.service.explain_stream(&req, bypass);

    let body = Body::from_stream(stream.chunks.map(|chunk: ExplanationChunk| {
        Ok::<_, Infallible>(Bytes::from(chunk.render().into_owned()))
    }));

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
            (X_ACCEL_BUFFERING, "no".to_string()),
            (X_BYPASS, if stream.bypass { "1" } else { "0" }.to_string()),
            (X_CACHE_KEY, stream.key.to_string()),
            (X_CACHE, stream.status.as_header_value().to_string()),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, ExplanationCache, Pacing};
    use crate::generation::{DeltaStream, GenerationError, GenerationRequest, Generator};
    use crate::server::build_router;
    use crate::service::ExplainService;
    use crate::types::STREAM_MARKER;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use std::time::Duration;
    use tower::ServiceExt;

    struct Canned;

    #[async_trait::async_trait]
    impl Generator for Canned {
        async fn complete(&self, _: &GenerationRequest) -> Result<String, GenerationError> {
            Ok("Generated explanation.".to_string())
        }

        async fn stream(&self, _: &GenerationRequest) -> Result<DeltaStream, GenerationError> {
            let deltas = ["Gener", "ated ", "stream."].map(|s| Ok(s.to_string()));
            Ok(Box::pin(futures::stream::iter(deltas)))
        }

        fn name(&self) -> &'static str {
            "canned"
        }
    }

    fn service() -> Arc<ExplainService> {
        Arc::new(ExplainService::new(
            Arc::new(Canned),
            Arc::new(ExplanationCache::new(Duration::from_secs(60))),
        ))
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const BODY: &str = r#"{"surah": 1, "ayah": 2, "text": "t", "translation": "tr", "options": {"style": "TLDR"}}"#;

    async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn call(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    #[test]
    fn truthy_values() {
        for v in ["1", "true", "TRUE", " yes "] {
            assert!(truthy(v), "{v}");
        }
        for v in ["", "0", "no", "false", "y"] {
            assert!(!truthy(v), "{v}");
        }
    }

    #[test]
    fn bypass_from_header_or_query() {
        let mut headers = HeaderMap::new();
        assert!(!bypass_requested(&headers, &BypassQuery::default()));
        let query = BypassQuery {
            bypass: Some("yes".into()),
        };
        assert!(bypass_requested(&headers, &query));
        headers.insert(BYPASS_HEADER, "1".parse().unwrap());
        assert!(bypass_requested(&headers, &BypassQuery::default()));
    }

    #[tokio::test]
    async fn healthz_reports_cache_stats() {
        let app = build_router(service(), None);
        let resp = call(&app, Request::get("/healthz").body(Body::empty()).unwrap()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(body["cache"]["entries"], 0);
        assert_eq!(body["cache"]["hits"], 0);
    }

    #[tokio::test]
    async fn explain_sets_x_cache_header() {
        let app = build_router(service(), None);

        let first = call(&app, post("/explain", BODY)).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["x-cache"], "MISS");
        let body: Value = serde_json::from_str(&body_string(first).await).unwrap();
        assert_eq!(body["explanation"], "Generated explanation.");
        assert_eq!(body["cached"], false);

        let second = call(&app, post("/explain", BODY)).await;
        assert_eq!(second.headers()["x-cache"], "HIT");
        let body: Value = serde_json::from_str(&body_string(second).await).unwrap();
        assert_eq!(body["cached"], true);

        let bypassed = call(&app, post("/explain?bypass=true", BODY)).await;
        assert_eq!(bypassed.headers()["x-cache"], "BYPASS-NEW");
    }

    #[tokio::test]
    async fn explain_stream_headers_and_body() {
        let svc = service();
        let app = build_router(Arc::clone(&svc), None);

        let resp = call(&app, post("/explain-stream", BODY)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers().clone();
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers["x-accel-buffering"], "no");
        assert_eq!(headers["x-bypass"], "0");
        assert_eq!(headers["x-cache-key"], "1:2:tldr:short");
        assert_eq!(headers["x-cache"], "MISS");
        assert_eq!(
            body_string(resp).await,
            format!("{STREAM_MARKER}Generated stream.")
        );

        let key = CacheKey::from_request(&serde_json::from_str(BODY).unwrap());
        assert_eq!(svc.cache().get(&key).unwrap().text(), "Generated stream.");
    }

    #[tokio::test]
    async fn explain_stream_replays_hits_and_honours_bypass_header() {
        let svc = service();
        let key = CacheKey::from_request(&serde_json::from_str(BODY).unwrap());
        svc.cache().put(
            &key,
            "cached text",
            Pacing::new(vec![6, 5], vec![Duration::ZERO, Duration::from_millis(1)]),
        );
        let app = build_router(Arc::clone(&svc), None);

        let hit = call(&app, post("/explain-stream", BODY)).await;
        assert_eq!(hit.headers()["x-cache"], "HIT");
        assert_eq!(body_string(hit).await, format!("{STREAM_MARKER}cached text"));

        let mut req = post("/explain-stream", BODY);
        req.headers_mut().insert(BYPASS_HEADER, "yes".parse().unwrap());
        let bypassed = call(&app, req).await;
        assert_eq!(bypassed.headers()["x-cache"], "BYPASS-NEW");
        assert_eq!(bypassed.headers()["x-bypass"], "1");
        assert_eq!(
            body_string(bypassed).await,
            format!("{STREAM_MARKER}Generated stream.")
        );
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let app = build_router(service(), None);
        let resp = call(&app, post("/explain", r#"{"surah": "one"}"#)).await;
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn cors_allows_configured_frontend() {
        let app = build_router(service(), Some("https://quran.example"));
        let req = Request::get("/healthz")
            .header(header::ORIGIN, "https://quran.example")
            .body(Body::empty())
            .unwrap();
        let resp = call(&app, req).await;
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://quran.example"
        );
    }
}
