use serde_json::Value;
use tokio::task::JoinHandle;
use tourbook_server::{AppConfig, build_app};

async fn start_server(cfg: AppConfig) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let app = build_app(&cfg).await.expect("build app");

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

#[tokio::test]
async fn server_endpoints_work() {
    tourbook_server::metrics::init_metrics();

    let mut cfg = AppConfig::default();
    cfg.proxy.api_key = Some("super-secret-key".to_string());
    let (base, shutdown_tx, handle) = start_server(cfg).await;
    let client = reqwest::Client::new();

    // GET /
    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "Tourbook Edge");
    assert_eq!(body["status"], "ok");

    // GET /healthz
    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(resp.status().is_success());
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    // GET /readyz reports the cache mode
    let resp = client.get(format!("{base}/readyz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["cache"], "local");

    // GET /api/config never leaks the provider key
    let resp = client.get(format!("{base}/api/config")).send().await.unwrap();
    assert!(resp.status().is_success());
    let text = resp.text().await.unwrap();
    assert!(!text.contains("super-secret-key"));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["data"]["proxy"]["basePath"], "/api/booking");
    assert_eq!(body["data"]["proxy"]["apiKeyConfigured"], true);
    assert_eq!(body["data"]["cache"]["mode"], "local");
    assert_eq!(body["data"]["cache"]["hotelListTtlSecs"], 300);

    // Incoming request ids are echoed back
    let resp = client
        .get(format!("{base}/healthz"))
        .header("x-request-id", "trace-me-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "trace-me-123");

    // GET /metrics after some traffic
    let resp = client.get(format!("{base}/metrics")).send().await.unwrap();
    assert!(resp.status().is_success());
    let text = resp.text().await.unwrap();
    assert!(text.contains("http_requests_total"));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn disabled_cache_reports_mode() {
    let mut cfg = AppConfig::default();
    cfg.cache.enabled = false;
    let (base, shutdown_tx, handle) = start_server(cfg).await;

    let body: Value = reqwest::get(format!("{base}/readyz"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["cache"], "disabled");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
