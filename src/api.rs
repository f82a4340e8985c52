//! ==============================================================================
//! api.rs - local json api for the dashboard ui
//! ==============================================================================
//!
//! purpose:
//!     translates state store reads (and the log clear command) into http.
//!     no business logic lives here; status_text arrives already classified.
//!
//! endpoints:
//!     GET  /api/status      latest snapshot (flat object)
//!     GET  /api/history     {download: [...], upload: [...]} oldest first
//!     GET  /api/logs        {logs: [{timestamp, level, message}, ...]}
//!     POST /api/logs/clear  empties the log store
//!     GET  /health          liveness check for the desktop shell
//!
//! relationships:
//!     - reads: store.rs (StateStore clone shared with the sampler)
//!     - started by: main.rs (loopback only)
//!
//! ==============================================================================

use crate::domain::{LogEntry, Snapshot};
use crate::store::{HistoryView, StateStore};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::info;

#[derive(Serialize)]
pub struct LogsResponse {
    pub logs: Vec<LogEntry>,
}

/// build the api router over a shared store
pub fn router(store: StateStore) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/history", get(history_handler))
        .route("/api/logs", get(logs_handler))
        .route("/api/logs/clear", post(clear_logs_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        // the ui is loaded from its own origin
        .layer(CorsLayer::permissive())
        .with_state(store)
}

/// bind `addr` and serve until `shutdown` resolves
pub async fn serve<F>(store: StateStore, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("[API] listening on http://{}", addr);

    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown)
        .await
        .context("api server error")?;
    Ok(())
}

// ==============================================================================
// handlers
// ==============================================================================

async fn status_handler(State(store): State<StateStore>) -> Json<Snapshot> {
    let snapshot = store.snapshot().await;
    Json(Snapshot::clone(&snapshot))
}

async fn history_handler(State(store): State<StateStore>) -> Json<HistoryView> {
    Json(store.history().await)
}

async fn logs_handler(State(store): State<StateStore>) -> Json<LogsResponse> {
    Json(LogsResponse { logs: store.logs().await })
}

async fn clear_logs_handler(State(store): State<StateStore>) -> Json<serde_json::Value> {
    let dropped = store.clear_logs().await;
    info!("[API] log store cleared ({} entries)", dropped);
    Json(serde_json::json!({"status": "ok"}))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn not_found_handler() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"status": "error", "message": "not found"})),
    )
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LinkStatus;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn call(store: &StateStore, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router(store.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn online_snapshot(down: f64, up: f64) -> Snapshot {
        let mut snap = Snapshot::connecting();
        snap.online = true;
        snap.status = LinkStatus::Online;
        snap.download_mbps = down;
        snap.upload_mbps = up;
        snap.ping_ms = 25.0;
        snap.obstructed_pct = 0.3;
        snap.ethernet_speed_mbps = 1000;
        snap
    }

    #[tokio::test]
    async fn test_status_before_first_tick() {
        let store = StateStore::new(30, 100);
        let (code, body) = call(&store, Method::GET, "/api/status").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["online"], false);
        assert_eq!(body["status_text"], "Connecting...");
    }

    #[tokio::test]
    async fn test_status_reports_committed_snapshot() {
        let store = StateStore::new(30, 100);
        store.commit_sample(online_snapshot(450.2, 120.5)).await;

        let (code, body) = call(&store, Method::GET, "/api/status").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["online"], true);
        assert_eq!(body["status_text"], "Online");
        assert_eq!(body["down"], 450.2);
        assert_eq!(body["up"], 120.5);
        assert_eq!(body["eth_speed"], 1000);
    }

    #[tokio::test]
    async fn test_history_round_trip_oldest_first() {
        let store = StateStore::new(30, 100);
        // 35 pushes: the first five fall off the front
        for i in 0..35 {
            store.commit_sample(online_snapshot(i as f64, i as f64 / 10.0)).await;
        }

        let (code, body) = call(&store, Method::GET, "/api/history").await;
        assert_eq!(code, StatusCode::OK);
        let download: Vec<f64> = serde_json::from_value(body["download"].clone()).unwrap();
        let upload: Vec<f64> = serde_json::from_value(body["upload"].clone()).unwrap();
        assert_eq!(download, (5..35).map(|i| i as f64).collect::<Vec<_>>());
        assert_eq!(upload.len(), 30);
        assert_eq!(upload[29], 3.4);
    }

    #[tokio::test]
    async fn test_history_padded_with_zeros() {
        let store = StateStore::new(30, 100);
        store.commit_sample(online_snapshot(7.0, 1.0)).await;

        let (_, body) = call(&store, Method::GET, "/api/history").await;
        let download = body["download"].as_array().unwrap();
        assert_eq!(download.len(), 30);
        assert_eq!(download[29], 7.0);
        assert!(download[..29].iter().all(|v| v.as_f64() == Some(0.0)));
    }

    #[tokio::test]
    async fn test_logs_and_clear() {
        let store = StateStore::new(30, 100);
        store.append_log(LogEntry::info("Link status changed: Connecting... -> Online")).await;
        store.append_log(LogEntry::error("Poll error: device unreachable: timeout")).await;

        let (_, body) = call(&store, Method::GET, "/api/logs").await;
        let logs = body["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0]["level"], "INFO");
        assert_eq!(logs[1]["level"], "ERROR");
        assert!(logs[1]["timestamp"].is_string());

        let (code, body) = call(&store, Method::POST, "/api/logs/clear").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (_, body) = call(&store, Method::GET, "/api/logs").await;
        assert!(body["logs"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let store = StateStore::new(30, 100);
        store.append_log(LogEntry::info("kept")).await;

        let (code, body) = call(&store, Method::GET, "/api/satellites").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
        assert_eq!(store.logs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_requires_post() {
        let store = StateStore::new(30, 100);
        store.append_log(LogEntry::info("kept")).await;

        let (code, _) = call(&store, Method::GET, "/api/logs/clear").await;
        assert!(code.is_client_error());
        assert_eq!(store.logs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_health() {
        let store = StateStore::new(30, 100);
        let (code, body) = call(&store, Method::GET, "/health").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let store = StateStore::new(30, 100);
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        // shutdown immediately: serve must bind, then return cleanly
        serve(store, addr, async {}).await.unwrap();
    }
}
