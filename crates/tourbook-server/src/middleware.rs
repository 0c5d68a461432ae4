use std::time::Duration;

use axum::extract::State;
use axum::{
    body::{Body, HttpBody},
    http::{HeaderName, HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tourbook_cache::{CacheKey, QueryCache};
use uuid::Uuid;

// Middleware that ensures each request has an X-Request-Id and mirrors it on the response
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static("x-request-id");

    // If the incoming request already has a request-id, preserve it; otherwise generate one
    let req_id_value = req.headers().get(&header_name).cloned().or_else(|| {
        HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()
    });

    let Some(req_id_value) = req_id_value else {
        return next.run(req).await;
    };

    // Add to request extensions for downstream usage (e.g., logging)
    req.extensions_mut().insert(req_id_value.clone());

    let mut res = next.run(req).await;

    // Add/propagate the request id header to response
    res.headers_mut().insert(header_name, req_id_value);

    res
}

// =============================================================================
// Response Cache Middleware
// =============================================================================

/// Diagnostic header telling whether a response came from the cache.
pub const X_CACHE_HEADER: &str = "x-cache";

/// State for [`cache_response`]: the cache to use and how long entries live.
#[derive(Clone, Debug)]
pub struct ResponseCache {
    pub cache: QueryCache,
    pub ttl: Duration,
    /// Largest body that will be buffered for caching. Bigger or unsized
    /// bodies pass through uncached.
    pub max_body_bytes: usize,
}

impl ResponseCache {
    pub fn new(cache: QueryCache, ttl: Duration, max_body_bytes: usize) -> Self {
        Self {
            cache,
            ttl,
            max_body_bytes,
        }
    }
}

/// Whole-response cache for JSON GET endpoints.
///
/// - Non-GET requests always bypass the cache.
/// - Key is `response:` + path and query string.
/// - Hit: the stored JSON is returned without calling downstream handlers.
/// - Miss: a `200 OK` JSON response whose size is known and within
///   `max_body_bytes` is stored, then returned unchanged. Anything else is
///   returned as-is and never stored.
pub async fn cache_response(
    State(state): State<ResponseCache>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), |pq| pq.as_str().to_string());
    let key = CacheKey::new("response").part(&target);

    if let Some(body) = state.cache.lookup(key.as_str()).await {
        tracing::debug!(key = %key, "response cache hit");
        return json_response(StatusCode::OK, body, "HIT");
    }

    let response = next.run(req).await;

    if response.status() != StatusCode::OK || !is_json(&response) {
        return response;
    }

    let Some(size) = declared_size(&response) else {
        tracing::debug!(key = %key, "response size unknown, not cached");
        return response;
    };
    if size > state.max_body_bytes as u64 {
        tracing::debug!(key = %key, size, limit = state.max_body_bytes, "response too large, not cached");
        return response;
    }

    let (mut parts, body) = response.into_parts();
    // The declared size is within the limit, so only a failing body stream lands here
    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Response body failed while buffering");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(serde_json::json!({
                    "success": false,
                    "error": "Internal Server Error",
                    "message": "Response body could not be read",
                })),
            )
                .into_response();
        }
    };

    match std::str::from_utf8(&bytes) {
        Ok(text) => {
            state
                .cache
                .store(key.as_str(), text.to_string(), state.ttl)
                .await;
        }
        Err(e) => tracing::warn!(key = %key, error = %e, "Response body is not UTF-8, not cached"),
    }

    parts
        .headers
        .insert(X_CACHE_HEADER, HeaderValue::from_static("MISS"));
    Response::from_parts(parts, Body::from(bytes))
}

/// Upper bound of the body size as promised by the body itself. Streams
/// without a bound report `None`.
fn declared_size(response: &Response) -> Option<u64> {
    response.body().size_hint().upper()
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("application/json"))
}

fn json_response(status: StatusCode, body: String, cache_state: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(X_CACHE_HEADER, HeaderValue::from_static(cache_state));
    response
}
