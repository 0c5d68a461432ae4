//! Forwarding to the upstream hotel API and the passthrough/fallback decision.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures_util::TryStreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::ProxyState;
use crate::error::ApiError;
use crate::server::AppState;

/// Per-request view of a proxied call. Never outlives the request.
#[derive(Debug, Clone)]
pub struct ProxyRequestContext {
    pub method: Method,
    /// Path with the proxy prefix rewritten away.
    pub path: String,
    pub query: Option<String>,
}

impl ProxyRequestContext {
    pub fn new(base_path: &str, method: Method, path: &str, query: Option<&str>) -> Self {
        Self {
            method,
            path: rewrite_path(base_path, path),
            query: query.filter(|q| !q.is_empty()).map(str::to_string),
        }
    }

    /// Upstream URL: base URL + rewritten path + original query.
    pub fn upstream_url(&self, upstream_base: &str) -> String {
        let mut url = format!("{}{}", upstream_base.trim_end_matches('/'), self.path);
        if let Some(query) = &self.query {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

/// What came back from the single upstream attempt.
pub enum UpstreamOutcome {
    /// Any non-451 status; body not yet read.
    Passthrough(reqwest::Response),
    /// HTTP 451 Unavailable For Legal Reasons; body not yet read.
    Blocked(reqwest::Response),
    /// DNS, connect, TLS, reset or timeout.
    Failed(String),
}

impl UpstreamOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passthrough(_) => "passthrough",
            Self::Blocked(_) => "blocked",
            Self::Failed(_) => "error",
        }
    }
}

/// Strip the proxy prefix: `/api/booking/v1/hotels` → `/v1/hotels`.
pub fn rewrite_path(base_path: &str, path: &str) -> String {
    match path.strip_prefix(base_path) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => path.to_string(),
    }
}

/// Handles every request under the proxy prefix.
///
/// Status and headers are inspected before the body: a passthrough streams
/// the upstream body unmodified, a fallback drops it unread and answers from
/// the catalog. The two never mix.
pub async fn handle_proxy(State(state): State<AppState>, request: Request<Body>) -> Response {
    let proxy = Arc::clone(&state.proxy);
    let ctx = ProxyRequestContext::new(
        &proxy.base_path,
        request.method().clone(),
        request.uri().path(),
        request.uri().query(),
    );

    info!(
        method = %ctx.method,
        path = %ctx.path,
        query = ctx.query.as_deref().unwrap_or(""),
        "Proxying request"
    );

    if proxy.mock_upstream {
        crate::metrics::record_proxy_outcome("mock");
        return proxy.catalog.resolve(&ctx.path).into_response();
    }

    let outcome = match forward(&proxy, &ctx, request).await {
        Ok(outcome) => outcome,
        Err(e) => return e.into_response(),
    };
    crate::metrics::record_proxy_outcome(outcome.label());

    match outcome {
        UpstreamOutcome::Passthrough(upstream) => passthrough(upstream),
        // Dropping the blocked response unread discards its body and headers
        UpstreamOutcome::Blocked(_) if proxy.fallback_enabled => {
            warn!(path = %ctx.path, cause = "451", "Upstream blocked, serving fallback data");
            proxy.catalog.resolve(&ctx.path).into_response()
        }
        UpstreamOutcome::Failed(reason) if proxy.fallback_enabled => {
            warn!(path = %ctx.path, cause = %reason, "Upstream unreachable, serving fallback data");
            proxy.catalog.resolve(&ctx.path).into_response()
        }
        UpstreamOutcome::Blocked(upstream) => passthrough(upstream),
        UpstreamOutcome::Failed(reason) => ApiError::BadGateway(reason).into_response(),
    }
}

/// Send the request upstream once. No retry: any failure is final.
async fn forward(
    proxy: &ProxyState,
    ctx: &ProxyRequestContext,
    request: Request<Body>,
) -> Result<UpstreamOutcome, ApiError> {
    let headers = outbound_headers(proxy, request.headers());

    let body = axum::body::to_bytes(request.into_body(), proxy.body_limit)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read request body: {e}")))?;

    let url = ctx.upstream_url(&proxy.upstream_url);
    debug!(url = %url, "Forwarding upstream");

    let result = proxy
        .client
        .request(ctx.method.clone(), &url)
        .headers(headers)
        .body(body)
        .timeout(proxy.timeout)
        .send()
        .await;

    Ok(match result {
        Ok(response) => {
            let status = response.status();
            info!(status = %status.as_u16(), path = %ctx.path, "Upstream responded");
            if status == StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS {
                UpstreamOutcome::Blocked(response)
            } else {
                UpstreamOutcome::Passthrough(response)
            }
        }
        Err(e) => {
            let reason = if e.is_timeout() {
                format!("Upstream timed out after {} seconds", proxy.timeout.as_secs())
            } else if e.is_connect() {
                format!("Failed to connect to upstream: {e}")
            } else {
                format!("Upstream request failed: {e}")
            };
            info!(path = %ctx.path, error = %reason, "Upstream request failed");
            UpstreamOutcome::Failed(reason)
        }
    })
}

/// Copy client headers minus hop-by-hop ones, then inject provider credentials.
fn outbound_headers(proxy: &ProxyState, incoming: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for (name, value) in incoming.iter() {
        // reqwest sets content-length from the buffered body
        if is_hop_by_hop_header(name.as_str()) || *name == header::CONTENT_LENGTH {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    for (name, value) in &proxy.provider_headers {
        headers.insert(name.clone(), value.clone());
    }

    headers
}

/// Stream the upstream response through with its status and end-to-end headers.
fn passthrough(upstream: reqwest::Response) -> Response {
    let mut builder = Response::builder().status(upstream.status());

    for (name, value) in upstream.headers().iter() {
        if !is_hop_by_hop_header(name.as_str()) {
            builder = builder.header(name, value);
        }
    }

    let stream = upstream
        .bytes_stream()
        .inspect_err(|e| warn!(error = %e, "Upstream body stream aborted"));

    builder
        .body(Body::from_stream(stream))
        .unwrap_or_else(|e| ApiError::Internal(format!("Failed to build response: {e}")).into_response())
}

/// Build the provider credential headers once at startup.
///
/// Invalid names or values are skipped with a warning rather than failing
/// every request later.
pub fn provider_headers(
    api_key_header: &str,
    api_key: Option<&str>,
    api_host_header: &str,
    api_host: Option<&str>,
) -> Vec<(HeaderName, HeaderValue)> {
    let pairs = [(api_key_header, api_key), (api_host_header, api_host)];

    pairs
        .into_iter()
        .filter_map(|(name, value)| {
            let value = value?;
            match (
                HeaderName::try_from(name),
                HeaderValue::try_from(value),
            ) {
                (Ok(name), Ok(mut value)) => {
                    value.set_sensitive(true);
                    Some((name, value))
                }
                _ => {
                    warn!(header = %name, "Invalid provider header name or value, skipping");
                    None
                }
            }
        })
        .collect()
}

/// Checks if a header is a hop-by-hop header that should not be forwarded.
///
/// Hop-by-hop headers are defined in RFC 2616 Section 13.5.1.
fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
            | "host" // Host should be set to target, not forwarded
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_hop_by_hop_header() {
        assert!(is_hop_by_hop_header("Connection"));
        assert!(is_hop_by_hop_header("Transfer-Encoding"));
        assert!(is_hop_by_hop_header("host"));
        assert!(!is_hop_by_hop_header("Content-Type"));
        assert!(!is_hop_by_hop_header("X-RapidAPI-Key"));
    }

    #[test]
    fn test_rewrite_path() {
        assert_eq!(rewrite_path("/api/booking", "/api/booking/v1/hotels/search"), "/v1/hotels/search");
        assert_eq!(rewrite_path("/api/booking", "/api/booking"), "/");
        // A sibling prefix is not the proxy prefix
        assert_eq!(rewrite_path("/api/booking", "/api/bookings/1"), "/api/bookings/1");
    }

    #[test]
    fn test_upstream_url_keeps_query() {
        let ctx = ProxyRequestContext::new(
            "/api/booking",
            Method::GET,
            "/api/booking/v1/hotels/search",
            Some("dest_id=London&units=metric"),
        );
        assert_eq!(
            ctx.upstream_url("https://booking-com.p.rapidapi.com/"),
            "https://booking-com.p.rapidapi.com/v1/hotels/search?dest_id=London&units=metric"
        );

        let bare = ProxyRequestContext::new("/api/booking", Method::GET, "/api/booking/v1/hotels/1", Some(""));
        assert_eq!(bare.query, None);
        assert_eq!(bare.upstream_url("http://up"), "http://up/v1/hotels/1");
    }

    #[test]
    fn test_provider_headers_skip_missing_and_invalid() {
        let headers = provider_headers("X-RapidAPI-Key", Some("secret"), "X-RapidAPI-Host", None);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].0.as_str(), "x-rapidapi-key");
        assert!(headers[0].1.is_sensitive());

        let invalid = provider_headers("bad header", Some("v"), "X-RapidAPI-Host", Some("bad\nvalue"));
        assert!(invalid.is_empty());
    }
}
