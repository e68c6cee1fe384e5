//! In-process fake backend for integration tests.
//!
//! Every request is recorded; answers come from a table keyed by method and
//! path (query excluded). Unknown routes answer 404. Broken routes send their
//! status line and then drop the connection partway through the body.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use futures::stream;
use serde_json::{json, Value};

use storefront_core::{CredentialStore, GatewayConfig, Storefront};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    /// Path and query as received, including the `/api` prefix
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Recorded {
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> &str {
        self.headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Default)]
struct Inner {
    routes: Mutex<HashMap<(Method, String), (StatusCode, Value)>>,
    broken: Mutex<HashMap<(Method, String), StatusCode>>,
    requests: Mutex<Vec<Recorded>>,
}

#[derive(Clone)]
pub struct FakeBackend {
    inner: Arc<Inner>,
    pub base_url: String,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let inner = Arc::new(Inner::default());
        let app = Router::new().fallback(handle).with_state(inner.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            inner,
            base_url: format!("http://{}/api", addr),
        }
    }

    /// Answer `method /api<path>` with `status` and `body`.
    pub fn route(&self, method: Method, path: &str, status: u16, body: Value) {
        let status = StatusCode::from_u16(status).unwrap();
        self.inner
            .routes
            .lock()
            .unwrap()
            .insert((method, format!("/api{}", path)), (status, body));
    }

    /// Answer `method /api<path>` with `status`, then fail while streaming the body.
    pub fn route_broken(&self, method: Method, path: &str, status: u16) {
        let status = StatusCode::from_u16(status).unwrap();
        self.inner
            .broken
            .lock()
            .unwrap()
            .insert((method, format!("/api{}", path)), status);
    }

    pub fn ok(&self, method: Method, path: &str, data: Value) {
        self.route(method, path, 200, json!({"success": true, "data": data}));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Recorded {
        self.requests().pop().expect("no request recorded")
    }

    pub fn storefront(&self, credentials: CredentialStore) -> Storefront {
        let config = GatewayConfig {
            base_url: self.base_url.clone(),
            timeout_secs: 5,
        };
        Storefront::new(&config, credentials).unwrap()
    }
}

async fn handle(
    State(inner): State<Arc<Inner>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let uri_text = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    inner.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        uri: uri_text,
        headers,
        body,
    });

    let key = (method, uri.path().to_string());
    let broken = inner.broken.lock().unwrap().get(&key).copied();
    if let Some(status) = broken {
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"{\"success\": fal")),
            Err(std::io::Error::other("connection reset")),
        ]);
        return (status, Body::from_stream(chunks)).into_response();
    }

    let answer = inner
        .routes
        .lock()
        .unwrap()
        .get(&key)
        .cloned();
    match answer {
        Some((status, body)) => (status, Json(body)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "message": "Route not found"})),
        )
            .into_response(),
    }
}

pub fn admin_user() -> Value {
    json!({"id": 1, "role": "admin"})
}
