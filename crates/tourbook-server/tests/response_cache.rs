use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tourbook_cache::{LocalStore, QueryCache};
use tourbook_server::middleware::{ResponseCache, cache_response};

type Calls = Arc<AtomicUsize>;

async fn counted(State(calls): State<Calls>) -> impl IntoResponse {
    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "success": true, "n": n }))
}

async fn missing(State(calls): State<Calls>) -> impl IntoResponse {
    calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "Not Found" })),
    )
}

async fn plain(State(calls): State<Calls>) -> impl IntoResponse {
    calls.fetch_add(1, Ordering::SeqCst);
    "not json"
}

async fn large(State(calls): State<Calls>) -> impl IntoResponse {
    calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "success": true, "data": "x".repeat(200) }))
}

async fn streamed(State(calls): State<Calls>) -> impl IntoResponse {
    calls.fetch_add(1, Ordering::SeqCst);
    let chunks = futures_util::stream::iter(vec![
        Ok::<_, std::io::Error>(r#"{"success":"#),
        Ok(r#"true}"#),
    ]);
    (
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(chunks),
    )
}

async fn start_server(ttl: Duration) -> (String, Calls, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    start_server_with_limit(ttl, 1024 * 1024).await
}

async fn start_server_with_limit(
    ttl: Duration,
    max_body_bytes: usize,
) -> (String, Calls, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let calls: Calls = Arc::new(AtomicUsize::new(0));
    let cache = ResponseCache::new(QueryCache::new(Arc::new(LocalStore::new())), ttl, max_body_bytes);

    let app = Router::new()
        .route("/counted", get(counted).post(counted))
        .route("/missing", get(missing))
        .route("/plain", get(plain))
        .route("/large", get(large))
        .route("/streamed", get(streamed))
        .layer(middleware::from_fn_with_state(cache, cache_response))
        .with_state(calls.clone());

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

    (format!("http://{addr}"), calls, tx, server)
}

fn cache_state(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get("x-cache")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn second_get_is_served_from_cache() {
    let (base, calls, shutdown_tx, handle) = start_server(Duration::from_secs(60)).await;

    let first = reqwest::get(format!("{base}/counted?page=1")).await.unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(cache_state(&first).as_deref(), Some("MISS"));
    let first_body: Value = first.json().await.unwrap();

    let second = reqwest::get(format!("{base}/counted?page=1")).await.unwrap();
    assert_eq!(second.status(), 200);
    assert_eq!(cache_state(&second).as_deref(), Some("HIT"));
    assert_eq!(second.headers()["content-type"], "application/json");
    let second_body: Value = second.json().await.unwrap();

    assert_eq!(first_body, second_body);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A different query string is a different entry
    let other: Value = reqwest::get(format!("{base}/counted?page=2"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(other["n"], 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn entries_expire_after_ttl() {
    let (base, calls, shutdown_tx, handle) = start_server(Duration::from_millis(100)).await;

    reqwest::get(format!("{base}/counted")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let resp = reqwest::get(format!("{base}/counted")).await.unwrap();

    assert_eq!(cache_state(&resp).as_deref(), Some("MISS"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn non_get_requests_bypass_cache() {
    let (base, calls, shutdown_tx, handle) = start_server(Duration::from_secs(60)).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let resp = client.post(format!("{base}/counted")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(cache_state(&resp), None);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // A POST never poisons the GET entry either
    let resp = client.get(format!("{base}/counted")).send().await.unwrap();
    assert_eq!(cache_state(&resp).as_deref(), Some("MISS"));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn only_successful_json_is_cached() {
    let (base, calls, shutdown_tx, handle) = start_server(Duration::from_secs(60)).await;

    for _ in 0..2 {
        let resp = reqwest::get(format!("{base}/missing")).await.unwrap();
        assert_eq!(resp.status(), 404);
        assert_eq!(cache_state(&resp), None);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    for _ in 0..2 {
        let resp = reqwest::get(format!("{base}/plain")).await.unwrap();
        assert_eq!(resp.text().await.unwrap(), "not json");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn oversized_response_passes_through_uncached() {
    let (base, calls, shutdown_tx, handle) = start_server_with_limit(Duration::from_secs(60), 64).await;

    for _ in 0..2 {
        let resp = reqwest::get(format!("{base}/large")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(cache_state(&resp), None);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_str().map(str::len), Some(200));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Small responses behind the same limit are still cached
    reqwest::get(format!("{base}/counted")).await.unwrap();
    let resp = reqwest::get(format!("{base}/counted")).await.unwrap();
    assert_eq!(cache_state(&resp).as_deref(), Some("HIT"));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn unsized_streaming_response_passes_through_uncached() {
    let (base, calls, shutdown_tx, handle) = start_server(Duration::from_secs(60)).await;

    for _ in 0..2 {
        let resp = reqwest::get(format!("{base}/streamed")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(cache_state(&resp), None);
        assert_eq!(resp.text().await.unwrap(), r#"{"success":true}"#);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
