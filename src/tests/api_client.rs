// Authenticated API requests through the coordinator.

#[cfg(test)]
mod test {

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::get;

use crate::store::{MemoryStore, SessionStore};
use crate::tests::common::{build_app, json, post, spawn_axum, Json, Router};
use crate::token::inspector::tests::jwt_expiring_in;

/// `/api/courses` echoes the Authorization header, `/api/auth/refresh-token`
/// hands out `fresh`.
async fn spawn_api(fresh: String) -> (tokio::task::JoinHandle<()>, std::net::SocketAddr, Arc<AtomicUsize>) {
    let refreshes = Arc::new(AtomicUsize::new(0));
    let refreshes_clone = refreshes.clone();
    let router = Router::new()
        .route(
            "/api/courses",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_owned();
                Json(json!({ "authorization": auth }))
            }),
        )
        .route(
            "/api/auth/refresh-token",
            post(move || {
                let refreshes = refreshes_clone.clone();
                let fresh = fresh.clone();
                async move {
                    refreshes.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "data": { "accessToken": fresh } }))
                }
            }),
        );
    let (handle, addr) = spawn_axum(router).await;
    (handle, addr, refreshes)
}

async fn authorization_seen(app: &crate::app::AppContext) -> String {
    let body: serde_json::Value = app
        .api
        .get("/courses")
        .await
        .send()
        .await
        .expect("courses request")
        .json()
        .await
        .expect("json body");
    body["authorization"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn fresh_token_is_attached_as_bearer() {
    let token = jwt_expiring_in(3600);
    let (server, addr, refreshes) = spawn_api(jwt_expiring_in(7200)).await;
    let store = MemoryStore::new();
    store.set("accessToken", &token).await.unwrap();
    let app = build_app(&format!("http://{}/api", addr), Arc::new(store));

    assert_eq!(authorization_seen(&app).await, format!("Bearer {}", token));
    assert_eq!(refreshes.load(Ordering::SeqCst), 0);

    server.abort();
}

#[tokio::test]
async fn stale_token_is_refreshed_before_the_request() {
    let fresh = jwt_expiring_in(3600);
    let (server, addr, refreshes) = spawn_api(fresh.clone()).await;
    let store = MemoryStore::new();
    store.set("accessToken", &jwt_expiring_in(60)).await.unwrap();
    let app = build_app(&format!("http://{}/api/", addr), Arc::new(store));

    assert_eq!(authorization_seen(&app).await, format!("Bearer {}", fresh));
    assert_eq!(authorization_seen(&app).await, format!("Bearer {}", fresh));
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);

    server.abort();
}

#[tokio::test]
async fn no_session_sends_unauthenticated_request() {
    let (server, addr, refreshes) = spawn_api("unused".to_owned()).await;
    let app = build_app(&format!("http://{}/api", addr), Arc::new(MemoryStore::new()));

    assert_eq!(authorization_seen(&app).await, "none");
    assert_eq!(refreshes.load(Ordering::SeqCst), 0);

    server.abort();
}

}
