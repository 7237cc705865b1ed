pub use axum::{routing::post, Json, Router};
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use reqwest::cookie::Jar;

use crate::app::AppContext;
use crate::config::loader::parse_config;
use crate::store::SessionStore;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// Refresh endpoint at `/api/auth/refresh-token` answering with `status`
/// and `body` after `delay`, counting every hit.
pub async fn spawn_refresh_endpoint(
    status: StatusCode,
    body: serde_json::Value,
    delay: Duration,
) -> (JoinHandle<()>, SocketAddr, Arc<AtomicUsize>) {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();
    let router = Router::new().route(
        "/api/auth/refresh-token",
        post(move || {
            let counter = counter_clone.clone();
            let body = body.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                (status, Json(body))
            }
        }),
    );
    let (handle, addr) = spawn_axum(router).await;
    (handle, addr, counter)
}

/// Application wired against `base_url` with the given store and an empty
/// cookie jar, like a freshly started process.
pub fn build_app(base_url: &str, store: Arc<dyn SessionStore>) -> AppContext {
    let cfg = parse_config(&format!("settings:\n  api:\n    base_url: {}\n", base_url)).expect("config");
    AppContext::with_parts(&cfg, store, Arc::new(Jar::default())).expect("app context")
}
