//! Provider client tests against a local axum server

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use fcdb_sync::config::ProviderSettings;
use fcdb_sync::error::FailureKind;
use fcdb_sync::provider::{ProviderClient, ProviderSource, RetryPolicy};
use fcdb_sync::SyncError;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct ServerLog {
    flaky_calls: AtomicUsize,
    missing_calls: AtomicUsize,
    headers: Mutex<Option<HeaderMap>>,
    pages: Mutex<Vec<Option<u32>>>,
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<u32>,
}

/// Serve the test routes on an ephemeral port; returns the base URL
async fn spawn_provider(log: Arc<ServerLog>) -> String {
    let app = Router::new()
        .route(
            "/metadata",
            get(|State(log): State<Arc<ServerLog>>, headers: HeaderMap| async move {
                *log.headers.lock().unwrap() = Some(headers);
                axum::Json(json!({ "data": [{ "id": 1, "name": "LeagueName_EPL" }] }))
            }),
        )
        .route(
            "/flaky",
            get(|State(log): State<Arc<ServerLog>>| async move {
                if log.flaky_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    (StatusCode::SERVICE_UNAVAILABLE, "busy".to_string())
                } else {
                    (StatusCode::OK, json!([{ "id": 2 }]).to_string())
                }
            }),
        )
        .route(
            "/missing",
            get(|State(log): State<Arc<ServerLog>>| async move {
                log.missing_calls.fetch_add(1, Ordering::SeqCst);
                StatusCode::NOT_FOUND
            }),
        )
        .route("/broken", get(|| async { "error" }))
        .route(
            "/traits",
            get(
                |State(log): State<Arc<ServerLog>>, Query(query): Query<PageQuery>| async move {
                    log.pages.lock().unwrap().push(query.page);
                    axum::Json(json!([{ "id": query.page, "name": "TraitName" }]))
                },
            ),
        )
        .with_state(log);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn client_for(base_url: &str) -> ProviderClient {
    let mut settings = ProviderSettings::with_base_url(base_url);
    settings.retry = RetryPolicy {
        max_retries: 2,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(20),
    };
    ProviderClient::new(&settings).unwrap()
}

#[tokio::test]
async fn test_browser_headers_and_envelope() {
    let log = Arc::new(ServerLog::default());
    let base_url = spawn_provider(log.clone()).await;

    let payload = client_for(&base_url).fetch("metadata", None).await.unwrap();
    assert_eq!(payload, json!([{ "id": 1, "name": "LeagueName_EPL" }]));

    let headers = log.headers.lock().unwrap().clone().unwrap();
    assert!(headers["user-agent"].to_str().unwrap().starts_with("Mozilla/5.0"));
    assert_eq!(headers["referer"], format!("{}/", base_url).as_str());
    assert!(headers["accept"].to_str().unwrap().contains("application/json"));
    assert_eq!(headers["sec-ch-ua-mobile"], "?0");
    assert!(headers.contains_key("sec-ch-ua"));
    assert!(headers.contains_key("sec-ch-ua-platform"));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let log = Arc::new(ServerLog::default());
    let base_url = spawn_provider(log.clone()).await;

    let payload = client_for(&base_url).fetch("flaky", None).await.unwrap();

    assert_eq!(payload, json!([{ "id": 2 }]));
    assert_eq!(log.flaky_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let log = Arc::new(ServerLog::default());
    let base_url = spawn_provider(log.clone()).await;

    let err = client_for(&base_url).fetch("missing", None).await.unwrap_err();

    assert!(matches!(err, SyncError::HttpStatus { status: 404, .. }));
    assert_eq!(err.kind(), FailureKind::Fetch);
    assert_eq!(log.missing_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_error_sentinel_body() {
    let base_url = spawn_provider(Arc::new(ServerLog::default())).await;

    let err = client_for(&base_url).fetch("broken", None).await.unwrap_err();

    assert!(matches!(err, SyncError::Provider(_)));
    assert_eq!(err.kind(), FailureKind::Fetch);
}

#[tokio::test]
async fn test_page_query_parameter() {
    let log = Arc::new(ServerLog::default());
    let base_url = spawn_provider(log.clone()).await;
    let client = client_for(&base_url);

    let page = client.fetch("traits", Some(3)).await.unwrap();
    client.fetch("traits", None).await.unwrap();

    assert_eq!(page[0]["id"], 3);
    assert_eq!(*log.pages.lock().unwrap(), vec![Some(3), None]);
}

#[tokio::test]
async fn test_unreachable_provider_is_network_error() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut settings = ProviderSettings::with_base_url(&format!("http://{}", addr));
    settings.retry = RetryPolicy::none();
    let err = ProviderClient::new(&settings)
        .unwrap()
        .fetch("metadata", None)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Network(_)), "{:?}", err);
}
