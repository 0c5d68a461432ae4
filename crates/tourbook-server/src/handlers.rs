use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::json;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Tourbook Edge",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Ready once state is built. The cache never gates readiness: a dead Redis
/// only means running unmemoized.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ready", "cache": state.cache.mode() })),
    )
}

/// Effective configuration, minus secrets.
pub async fn active_config(State(state): State<AppState>) -> impl IntoResponse {
    let cfg = &state.config;
    let body = json!({
        "success": true,
        "data": {
            "version": env!("CARGO_PKG_VERSION"),
            "proxy": {
                "basePath": cfg.proxy.base_path,
                "upstreamUrl": cfg.proxy.upstream_url,
                "apiKeyConfigured": cfg.proxy.api_key.is_some(),
                "mockUpstream": cfg.proxy.mock_upstream,
                "fallbackEnabled": cfg.proxy.fallback_enabled,
            },
            "cache": {
                "mode": state.cache.mode(),
                "hotelListTtlSecs": cfg.cache.hotel_list_ttl_secs,
                "hotelDetailTtlSecs": cfg.cache.hotel_detail_ttl_secs,
                "responseTtlSecs": cfg.cache.response_ttl_secs,
            },
        },
    });
    (StatusCode::OK, Json(body))
}

pub async fn metrics() -> impl IntoResponse {
    match crate::metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "Service Unavailable",
                "message": "Metrics recorder is not installed",
            })),
        )
            .into_response(),
    }
}
