//! End-to-end checks of the bearer hook and the admin lookup against a
//! local stand-in for the portal backend.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::Json;
use serde_json::{json, Value};

use bookdesk_core::auth::TokenStore;
use bookdesk_core::storage::MemoryStore;
use bookdesk_core::{ApiClient, ApiError, Router, SessionContext};

#[derive(Default)]
struct Backend {
    is_admin: Mutex<Option<bool>>,
    seen_auth: Mutex<Vec<Option<String>>>,
}

async fn users_me(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    backend.seen_auth.lock().unwrap().push(auth);

    match *backend.is_admin.lock().unwrap() {
        Some(is_admin) => (StatusCode::OK, Json(json!({ "IsAdmin": is_admin, "Email": "ops@example.com" }))),
        None => (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "not authenticated" }))),
    }
}

async fn spawn_backend(backend: Arc<Backend>) -> String {
    let app = axum::Router::new()
        .route("/api/v1/users/me", get(users_me))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/v1", addr)
}

struct Harness {
    backend: Arc<Backend>,
    tokens: TokenStore,
    router: Arc<Router>,
    session: SessionContext,
}

async fn harness() -> Harness {
    let backend = Arc::new(Backend::default());
    let base_url = spawn_backend(backend.clone()).await;

    let tokens = TokenStore::new(Arc::new(MemoryStore::new()));
    let api = ApiClient::new(&base_url, Duration::from_secs(5), tokens.clone()).unwrap();
    let router = Arc::new(Router::with_defaults(tokens.clone()));
    let session = SessionContext::new(tokens.clone(), api, router.clone());

    Harness {
        backend,
        tokens,
        router,
        session,
    }
}

#[tokio::test]
async fn test_check_admin_true() {
    let h = harness().await;
    *h.backend.is_admin.lock().unwrap() = Some(true);
    h.tokens.set_token("tok-admin").unwrap();

    assert!(h.session.check_admin().await.unwrap());
    assert!(h.session.is_admin());
}

#[tokio::test]
async fn test_check_admin_false() {
    let h = harness().await;
    *h.backend.is_admin.lock().unwrap() = Some(true);
    h.tokens.set_token("tok").unwrap();
    h.session.check_admin().await.unwrap();
    assert!(h.session.is_admin());

    *h.backend.is_admin.lock().unwrap() = Some(false);
    assert!(!h.session.check_admin().await.unwrap());
    assert!(!h.session.is_admin());
}

#[tokio::test]
async fn test_check_admin_error_keeps_flag() {
    let h = harness().await;
    *h.backend.is_admin.lock().unwrap() = Some(true);
    h.tokens.set_token("tok").unwrap();
    h.session.check_admin().await.unwrap();

    *h.backend.is_admin.lock().unwrap() = None;
    let err = h.session.check_admin().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(h.session.is_admin());
}

#[tokio::test]
async fn test_bearer_header_on_the_wire() {
    let h = harness().await;
    *h.backend.is_admin.lock().unwrap() = Some(false);

    h.session.check_admin().await.unwrap();
    h.tokens.set_token("abc.def.ghi").unwrap();
    h.session.check_admin().await.unwrap();

    let seen = h.backend.seen_auth.lock().unwrap().clone();
    assert_eq!(seen, vec![None, Some("Bearer abc.def.ghi".to_string())]);
}

#[tokio::test]
async fn test_admin_subscriber_notified() {
    let h = harness().await;
    *h.backend.is_admin.lock().unwrap() = Some(true);
    h.tokens.set_token("tok").unwrap();

    let mut rx = h.session.subscribe_admin();
    h.session.check_admin().await.unwrap();
    rx.changed().await.unwrap();
    assert!(*rx.borrow());
}

#[tokio::test]
async fn test_logout_navigates_router_to_login() {
    let h = harness().await;
    h.tokens.set_token("tok").unwrap();
    h.router.push("/admin");
    assert_eq!(h.router.current().unwrap().route.name, "admin");

    h.session.logout();
    assert_eq!(h.router.current().unwrap().path, "/login");
    assert!(!h.tokens.has_token());

    // Without a token the guard now turns the admin page away
    let nav = h.router.push("/admin");
    assert_eq!(nav.landed_on().unwrap().path, "/login");
}
