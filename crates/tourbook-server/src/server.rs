use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{any, get},
};
use tourbook_cache::QueryCache;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::AppConfig,
    handlers,
    hotels::{self, HotelSource, InMemoryHotelSource},
    metrics as app_metrics,
    middleware::{self as app_middleware, ResponseCache},
    proxy::{self, ProxyState},
};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: QueryCache,
    pub hotels: Arc<dyn HotelSource>,
    pub proxy: Arc<ProxyState>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        cache: QueryCache,
        hotels: Arc<dyn HotelSource>,
        proxy: ProxyState,
    ) -> Self {
        Self {
            config: Arc::new(config),
            cache,
            hotels,
            proxy: Arc::new(proxy),
        }
    }

    /// Wire up cache, hotel source and proxy from configuration.
    pub async fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let cache = if cfg.cache.enabled {
            let store = crate::create_cache_store(&cfg.redis, cfg.cache.local_max_entries).await;
            QueryCache::new(store)
        } else {
            tracing::info!("Caching disabled, every read hits the source");
            QueryCache::disabled()
        };

        let hotels = match cfg.data.hotels_file.as_deref() {
            Some(path) => InMemoryHotelSource::from_file(path)?,
            None => InMemoryHotelSource::builtin()?,
        };
        tracing::info!(count = hotels.len(), "Hotel source loaded");

        let proxy = ProxyState::from_config(cfg)?;

        Ok(Self::new(cfg.clone(), cache, Arc::new(hotels), proxy))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("cache", &self.cache)
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}

pub struct TourbookServer {
    addr: SocketAddr,
    app: Router,
}

/// Build the full router from configuration.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let state = AppState::from_config(cfg).await?;
    Ok(build_router(state))
}

/// Build the router over an already assembled state.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    let base_path = state.proxy.base_path.clone();
    let response_cache = ResponseCache::new(
        state.cache.clone(),
        state.config.cache.response_ttl(),
        state.config.cache.response_max_body_bytes,
    );

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/api/config", get(handlers::active_config))
        .route("/metrics", get(handlers::metrics))
        // Cached read paths
        .route("/api/hotels", get(hotels::list_hotels))
        .route("/api/hotels/{id}", get(hotels::get_hotel))
        .route(
            "/api/locations",
            get(hotels::list_locations).route_layer(middleware::from_fn_with_state(
                response_cache,
                app_middleware::cache_response,
            )),
        )
        // Upstream proxy, every method
        .route(&base_path, any(proxy::handle_proxy))
        .route(&format!("{base_path}/{{*path}}"), any(proxy::handle_proxy))
        .route_layer(middleware::from_fn(app_metrics::track_http))
        .with_state(state)
        // Middleware stack (outermost first: request id -> trace -> cors -> body limit)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(app_middleware::request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<_>| {
                            use tracing::field::Empty;
                            let method = req.method().clone();
                            let uri = req.uri().clone();
                            let req_id = req
                                .extensions()
                                .get::<axum::http::HeaderValue>()
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("")
                                .to_string();
                            tracing::info_span!(
                                "http.request",
                                http.method = %method,
                                http.target = %uri,
                                http.status_code = Empty,
                                request_id = %req_id
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<_>,
                             latency: std::time::Duration,
                             span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(CorsLayer::permissive())
                .layer(axum::extract::DefaultBodyLimit::max(body_limit)),
        )
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<TourbookServer> {
        let app = build_app(&self.config).await?;

        Ok(TourbookServer {
            addr: self.addr,
            app,
        })
    }
}

impl TourbookServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
