//! Reverse proxy to the third-party hotel API with regional-block fallback.
//!
//! # Request lifecycle
//!
//! ```text
//! FORWARDING ──▶ UPSTREAM_OK       (non-451: stream through unchanged)
//!     │
//!     ├────────▶ UPSTREAM_BLOCKED  (451)       ─┐
//!     │                                         ├─▶ FALLBACK_RESOLVED
//!     └────────▶ UPSTREAM_ERROR    (transport) ─┘   (catalog body + X-Mock-Data)
//! ```
//!
//! A 451 and a transport error resolve through the same catalog lookup, so the
//! client cannot tell the two causes apart. There is no retry before falling
//! back.

pub mod fallback;
pub mod forward;

use axum::http::{HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, ProxyConfig};

pub use fallback::{CatalogError, EndpointShape, FallbackCatalog, FallbackResponse, MOCK_DATA_HEADER};
pub use forward::{ProxyRequestContext, UpstreamOutcome, handle_proxy, rewrite_path};

/// Everything the proxy handler needs, built once at startup.
pub struct ProxyState {
    pub client: reqwest::Client,
    pub base_path: String,
    pub upstream_url: String,
    pub timeout: Duration,
    pub body_limit: usize,
    pub fallback_enabled: bool,
    pub mock_upstream: bool,
    pub provider_headers: Vec<(HeaderName, HeaderValue)>,
    pub catalog: Arc<FallbackCatalog>,
}

impl std::fmt::Debug for ProxyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyState")
            .field("base_path", &self.base_path)
            .field("upstream_url", &self.upstream_url)
            .field("timeout", &self.timeout)
            .field("fallback_enabled", &self.fallback_enabled)
            .field("mock_upstream", &self.mock_upstream)
            .finish_non_exhaustive()
    }
}

impl ProxyState {
    pub fn new(
        client: reqwest::Client,
        config: &ProxyConfig,
        body_limit: usize,
        catalog: FallbackCatalog,
    ) -> Self {
        let api_host = config.resolved_api_host();
        let provider_headers = forward::provider_headers(
            &config.api_key_header,
            config.api_key.as_deref(),
            &config.api_host_header,
            api_host.as_deref(),
        );

        if config.api_key.is_none() && !config.mock_upstream {
            tracing::warn!("proxy.api_key is not set; upstream requests will be unauthenticated");
        }

        Self {
            client,
            base_path: config.base_path.clone(),
            upstream_url: config.upstream_url.clone(),
            timeout: config.timeout(),
            body_limit,
            fallback_enabled: config.fallback_enabled,
            mock_upstream: config.mock_upstream,
            provider_headers,
            catalog: Arc::new(catalog),
        }
    }

    /// Build from application config, loading the fallback catalog from
    /// `proxy.fallback_file` or the built-in fixture.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, CatalogError> {
        let catalog = match cfg.proxy.fallback_file.as_deref() {
            Some(path) => FallbackCatalog::from_file(path)?,
            None => FallbackCatalog::builtin()?,
        };
        tracing::info!(
            search = catalog.hotel_search.len(),
            hotels = catalog.hotels.len(),
            locations = catalog.locations.len(),
            "Fallback catalog loaded"
        );

        Ok(Self::new(
            reqwest::Client::new(),
            &cfg.proxy,
            cfg.server.body_limit_bytes,
            catalog,
        ))
    }
}
