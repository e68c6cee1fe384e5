mod common;

use axum::http::Method;
use futures::future;
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;

use common::{admin_user, FakeBackend};
use storefront_core::models::{LoginRequest, ProfileUpdate, RegisterRequest, UserProfile};
use storefront_core::{CredentialStore, Navigation, Route, SessionEvent, SessionSnapshot};

fn login_request() -> LoginRequest {
    LoginRequest {
        email: "admin@shop.test".to_string(),
        password: "secret".to_string(),
    }
}

fn admin_profile() -> UserProfile {
    serde_json::from_value(admin_user()).unwrap()
}

async fn signed_in(backend: &FakeBackend, store: &CredentialStore) -> storefront_core::Storefront {
    backend.ok(Method::POST, "/auth/login", json!({"token": "T1", "user": admin_user()}));
    let storefront = backend.storefront(store.clone());
    storefront.session.login(&login_request()).await.unwrap();
    storefront
}

#[tokio::test]
async fn test_login_stores_session_everywhere() {
    let backend = FakeBackend::start().await;
    let store = CredentialStore::in_memory();
    let storefront = signed_in(&backend, &store).await;

    assert_eq!(
        storefront.session.snapshot(),
        SessionSnapshot {
            user: Some(admin_profile()),
            token: Some("T1".to_string()),
            loading: false,
            error: None,
        }
    );
    let record = store.load().unwrap().unwrap();
    assert_eq!(record.token, "T1");
    assert_eq!(record.user, admin_profile());

    let sent = backend.last_request();
    assert_eq!(sent.method, Method::POST);
    assert_eq!(sent.uri, "/api/auth/login");
    assert_eq!(sent.json(), json!({"email": "admin@shop.test", "password": "secret"}));
    assert_eq!(sent.authorization(), None);
}

#[tokio::test]
async fn test_login_then_logout_is_anonymous() {
    let backend = FakeBackend::start().await;
    let store = CredentialStore::in_memory();
    let storefront = signed_in(&backend, &store).await;
    let mut events = storefront.session.events();

    storefront.session.logout();
    assert_eq!(storefront.session.snapshot(), SessionSnapshot::default());
    assert!(store.load().unwrap().is_none());
    assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedOut);
}

#[tokio::test]
async fn test_failed_login_records_error() {
    let backend = FakeBackend::start().await;
    backend.route(
        Method::POST,
        "/auth/login",
        400,
        json!({"success": false, "message": "Invalid credentials", "errors": [{"field": "email"}]}),
    );
    let store = CredentialStore::in_memory();
    let storefront = backend.storefront(store.clone());

    let err = storefront.session.login(&login_request()).await.unwrap_err();
    assert_eq!(err.status(), 400);
    assert_eq!(err.message(), "Invalid credentials");
    assert_eq!(err.errors().len(), 1);

    let snapshot = storefront.session.snapshot();
    assert!(!snapshot.is_authenticated());
    assert!(!snapshot.loading);
    assert_eq!(snapshot.error, Some(err));
    assert!(!store.has_credentials());
}

#[tokio::test]
async fn test_register_persists_session() {
    let backend = FakeBackend::start().await;
    backend.ok(
        Method::POST,
        "/auth/register",
        json!({"token": "T2", "user": {"id": 2, "name": "Ana", "role": "customer"}}),
    );
    let store = CredentialStore::in_memory();
    let storefront = backend.storefront(store.clone());

    let user = storefront
        .session
        .register(&RegisterRequest {
            name: "Ana".to_string(),
            email: "ana@shop.test".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(user.name(), Some("Ana"));
    assert!(!user.is_admin());
    assert_eq!(store.token().unwrap().as_deref(), Some("T2"));
    assert_eq!(backend.last_request().uri, "/api/auth/register");
}

#[tokio::test]
async fn test_unauthorized_ends_session_before_caller_sees_error() {
    let backend = FakeBackend::start().await;
    let store = CredentialStore::in_memory();
    let storefront = signed_in(&backend, &store).await;
    backend.route(
        Method::GET,
        "/auth/profile",
        401,
        json!({"success": false, "message": "Token expired"}),
    );
    let mut events = storefront.session.events();

    let err = storefront.session.fetch_profile().await.unwrap_err();
    assert_eq!(err.status(), 401);
    assert_eq!(err.message(), "Token expired");
    assert!(err.is_unauthorized());

    assert!(!store.has_credentials());
    let snapshot = storefront.session.snapshot();
    assert!(snapshot.token.is_none());
    assert!(snapshot.user.is_none());
    assert!(!snapshot.loading);
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Expired {
            redirect: Route::Login
        }
    );
    assert_eq!(backend.last_request().authorization(), Some("Bearer T1"));
}

#[tokio::test]
async fn test_unauthorized_from_catalog_call_ends_session() {
    let backend = FakeBackend::start().await;
    let store = CredentialStore::in_memory();
    let storefront = signed_in(&backend, &store).await;
    backend.route(Method::DELETE, "/products/p1", 401, json!({"success": false}));

    let err = storefront.products.delete_product("p1").await.unwrap_err();
    assert_eq!(err.status(), 401);
    assert!(!storefront.session.is_authenticated());
    assert!(store.load().unwrap().is_none());
    assert_eq!(
        storefront.session.authorize(Route::Categories),
        Navigation::Redirect(Route::Login)
    );
}

#[tokio::test]
async fn test_concurrent_unauthorized_calls_expire_once() {
    let backend = FakeBackend::start().await;
    let store = CredentialStore::in_memory();
    let storefront = signed_in(&backend, &store).await;
    backend.route(Method::GET, "/auth/profile", 401, json!({"success": false}));
    backend.route(Method::DELETE, "/products/p1", 401, json!({"success": false}));
    let mut events = storefront.session.events();

    let (profile, delete) = future::join(
        storefront.session.fetch_profile(),
        storefront.products.delete_product("p1"),
    )
    .await;
    assert_eq!(profile.unwrap_err().status(), 401);
    assert_eq!(delete.unwrap_err().status(), 401);

    assert!(!store.has_credentials());
    assert!(!storefront.session.is_authenticated());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Expired {
            redirect: Route::Login
        }
    );
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_unauthorized_with_unreadable_body_still_ends_session() {
    let backend = FakeBackend::start().await;
    let store = CredentialStore::in_memory();
    let storefront = signed_in(&backend, &store).await;
    backend.route_broken(Method::GET, "/categories", 401);

    let err = storefront.categories.fetch_categories().await.unwrap_err();
    assert_eq!(err.status(), 401);
    assert!(!store.has_credentials());
    assert!(!storefront.session.is_authenticated());
}

#[tokio::test]
async fn test_wrong_password_does_not_expire_anything() {
    let backend = FakeBackend::start().await;
    backend.route(
        Method::POST,
        "/auth/login",
        401,
        json!({"success": false, "message": "Invalid credentials"}),
    );
    let storefront = backend.storefront(CredentialStore::in_memory());
    let mut events = storefront.session.events();

    let err = storefront.session.login(&login_request()).await.unwrap_err();
    assert_eq!(err.message(), "Invalid credentials");
    assert_eq!(storefront.session.snapshot().error, Some(err));
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_fetch_profile_refreshes_store() {
    let backend = FakeBackend::start().await;
    let store = CredentialStore::in_memory();
    let storefront = signed_in(&backend, &store).await;
    backend.ok(
        Method::GET,
        "/auth/profile",
        json!({"id": 1, "role": "admin", "name": "Root"}),
    );

    let user = storefront.session.fetch_profile().await.unwrap();
    assert_eq!(user.name(), Some("Root"));
    assert_eq!(store.user().unwrap(), Some(user.clone()));
    assert_eq!(storefront.session.current_user(), Some(user));
    assert_eq!(store.token().unwrap().as_deref(), Some("T1"));
}

#[tokio::test]
async fn test_update_profile_merges_fields() {
    let backend = FakeBackend::start().await;
    let store = CredentialStore::in_memory();
    let storefront = signed_in(&backend, &store).await;
    backend.ok(Method::PUT, "/auth/profile", json!({"phone": "555-0100"}));

    let update = ProfileUpdate {
        phone: Some("555-0100".to_string()),
        ..Default::default()
    };
    let user = storefront.session.update_profile(&update).await.unwrap();
    assert_eq!(user.role(), Some("admin"));
    assert_eq!(user.get("phone"), Some(&json!("555-0100")));
    assert_eq!(store.user().unwrap(), Some(user));
    assert_eq!(backend.last_request().json(), json!({"phone": "555-0100"}));
}

#[tokio::test]
async fn test_initialize_restores_stored_session() {
    let backend = FakeBackend::start().await;
    let store = CredentialStore::in_memory();
    store.save("T9", &admin_profile()).unwrap();

    let storefront = backend.storefront(store.clone());
    assert!(storefront.session.initialize().unwrap());
    assert!(storefront.session.initialize().unwrap());
    assert!(storefront.session.is_admin());

    backend.ok(Method::GET, "/categories", json!([]));
    storefront.categories.fetch_categories().await.unwrap();
    assert_eq!(backend.last_request().authorization(), Some("Bearer T9"));
}

#[tokio::test]
async fn test_success_false_is_an_error() {
    let backend = FakeBackend::start().await;
    backend.route(
        Method::POST,
        "/auth/login",
        200,
        json!({"success": false, "message": "Account disabled"}),
    );
    let store = CredentialStore::in_memory();
    let storefront = backend.storefront(store.clone());

    let err = storefront.session.login(&login_request()).await.unwrap_err();
    assert_eq!(err.status(), 200);
    assert_eq!(err.message(), "Account disabled");
    assert!(!storefront.session.is_authenticated());
    assert!(!store.has_credentials());
}
