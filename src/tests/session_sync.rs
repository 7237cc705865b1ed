// Persistent store and in-memory session stay in step across login,
// refresh and logout.

#[cfg(test)]
mod test {

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;

use crate::session::{Session, UserProfile};
use crate::store::{FileStore, MemoryStore, SessionStore};
use crate::tests::common::{build_app, json, spawn_refresh_endpoint};
use crate::token::inspector::tests::jwt_expiring_in;

#[tokio::test]
async fn login_refresh_logout_round() {
    let fresh = jwt_expiring_in(3600);
    let (server, addr, _hits) =
        spawn_refresh_endpoint(StatusCode::OK, json!({"data": {"accessToken": fresh}}), Duration::ZERO).await;

    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("session.json"));
    let app = build_app(&format!("http://{}/api", addr), Arc::new(store.clone()));
    let mut rx = app.session.subscribe();

    // login with a token that is already inside the refresh buffer
    let user = UserProfile { email: Some("student@example.com".into()), ..Default::default() };
    app.session.set_credentials(&jwt_expiring_in(120), Some(user.clone())).await.unwrap();
    assert!(rx.borrow_and_update().is_authenticated);

    // refresh replaces the token in both places, the profile is kept
    assert_eq!(app.coordinator.get_valid_access_token().await, Some(fresh.clone()));
    assert!(rx.has_changed().unwrap());
    let session = rx.borrow_and_update().clone();
    assert_eq!(session.token, Some(fresh.clone()));
    assert_eq!(session.user, Some(user));
    assert_eq!(store.get("accessToken").await.unwrap(), Some(fresh));

    app.session.logout().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), Session::default());
    assert_eq!(store.get("accessToken").await.unwrap(), None);
    assert_eq!(store.get("user").await.unwrap(), None);
    assert_eq!(app.coordinator.get_valid_access_token().await, None);

    server.abort();
}

#[tokio::test]
async fn hydrated_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let token = jwt_expiring_in(3600);

    {
        let app = build_app("http://127.0.0.1:1/api", Arc::new(FileStore::new(&path)));
        app.session.set_credentials(&token, None).await.unwrap();
    }

    let app = build_app("http://127.0.0.1:1/api", Arc::new(FileStore::new(&path)));
    let session = app.session.hydrate().await.unwrap();
    assert!(session.is_authenticated);
    assert_eq!(app.coordinator.get_valid_access_token().await, Some(token));
}

#[tokio::test]
async fn logout_during_refresh_stays_logged_out() {
    let fresh = jwt_expiring_in(3600);
    let (server, addr, hits) = spawn_refresh_endpoint(
        StatusCode::OK,
        json!({"data": {"accessToken": fresh}}),
        Duration::from_millis(200),
    )
    .await;

    let store = MemoryStore::new();
    let app = build_app(&format!("http://{}/api", addr), Arc::new(store.clone()));
    app.session.set_credentials(&jwt_expiring_in(60), None).await.unwrap();

    let pending = tokio::spawn({
        let coordinator = app.coordinator.clone();
        async move { coordinator.get_valid_access_token().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    app.session.logout().await.unwrap();

    assert_eq!(pending.await.unwrap(), None);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(store.is_empty().await);
    assert_eq!(app.session.snapshot(), Session::default());
    assert_eq!(app.coordinator.get_valid_access_token().await, None);

    server.abort();
}

#[tokio::test]
async fn relogin_during_failed_refresh_keeps_new_session() {
    let (server, addr, _hits) = spawn_refresh_endpoint(
        StatusCode::UNAUTHORIZED,
        json!({"message": "refresh token expired"}),
        Duration::from_millis(200),
    )
    .await;

    let store = MemoryStore::new();
    let app = build_app(&format!("http://{}/api", addr), Arc::new(store.clone()));
    app.session.set_credentials(&jwt_expiring_in(60), None).await.unwrap();

    let pending = tokio::spawn({
        let coordinator = app.coordinator.clone();
        async move { coordinator.refresh_token_if_needed().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    let relogged = jwt_expiring_in(3600);
    app.session.set_credentials(&relogged, None).await.unwrap();

    assert_eq!(pending.await.unwrap(), Ok(None));
    assert_eq!(store.get("accessToken").await.unwrap(), Some(relogged.clone()));
    let session = app.session.snapshot();
    assert!(session.is_authenticated);
    assert_eq!(session.token, Some(relogged));

    server.abort();
}

}
