//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An in-memory store behind the real router
//! - Temporary uploads and static directories
//! - Signup/login helpers returning the session cookie
//! - A small request/response wrapper

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use taskdeck_api::app::{build_router, AppState};
use taskdeck_api::config::Config;
use taskdeck_shared::store::MemoryStore;
use tempfile::TempDir;
use tower::Service as _;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const PASSWORD: &str = "longpass1";

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub config: Config,
    /// Holds uploads/ and the static files; removed on drop
    pub root: TempDir,
}

/// Response captured by [`TestContext::send`]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "Response body is not JSON ({}): {}",
                e,
                String::from_utf8_lossy(&self.body)
            )
        })
    }

    /// The `Set-Cookie` header, if any
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// `name=value` part of the `Set-Cookie` header, ready for a `Cookie` header
    pub fn cookie_pair(&self) -> String {
        let set_cookie = self.set_cookie().expect("Response has no Set-Cookie header");
        set_cookie
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

impl TestContext {
    /// Creates a context with default settings
    pub fn new() -> Self {
        Self::with_vars(&[])
    }

    /// Creates a context with extra configuration variables
    pub fn with_vars(extra: &[(&str, &str)]) -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let static_dir = root.path().join("public");
        let uploads_dir = static_dir.join("uploads");
        std::fs::create_dir_all(&uploads_dir).expect("Failed to create uploads dir");
        std::fs::write(static_dir.join("index.html"), "<h1>TaskDeck</h1>")
            .expect("Failed to write index.html");

        let static_dir = static_dir.to_string_lossy().to_string();
        let uploads_dir = uploads_dir.to_string_lossy().to_string();
        let mut vars: Vec<(String, String)> = vec![
            ("DATABASE_URL".into(), "postgresql://unused/test".into()),
            ("JWT_SECRET".into(), JWT_SECRET.into()),
            ("STATIC_DIR".into(), static_dir),
            ("UPLOADS_DIR".into(), uploads_dir),
        ];
        vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let config = Config::from_vars(|key| {
            vars.iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
        .expect("Invalid test configuration");

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), config.clone());
        let app = build_router(state);

        Self {
            app,
            store,
            config,
            root,
        }
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Sends a request with an optional cookie and JSON body
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };

        self.send(request.unwrap()).await
    }

    /// Signs up `email` with [`PASSWORD`] and returns the new user id
    pub async fn signup(&self, email: &str) -> Uuid {
        let response = self
            .request(
                Method::POST,
                "/api/signup",
                None,
                Some(serde_json::json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "signup failed");

        response.json()["userId"]
            .as_str()
            .and_then(|id| id.parse().ok())
            .expect("signup response has no userId")
    }

    /// Logs in and returns the `authToken=...` cookie pair
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/login",
                None,
                Some(serde_json::json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed");
        response.cookie_pair()
    }

    /// Signs up and logs in, returning the user id and cookie
    pub async fn user(&self, email: &str) -> (Uuid, String) {
        let id = self.signup(email).await;
        let cookie = self.login(email).await;
        (id, cookie)
    }

    /// Creates a task and returns its id
    pub async fn create_task(&self, cookie: &str, title: &str) -> Uuid {
        let response = self
            .request(
                Method::POST,
                "/api/tasks",
                Some(cookie),
                Some(serde_json::json!({ "title": title })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "task creation failed");

        response.json()["id"]
            .as_str()
            .and_then(|id| id.parse().ok())
            .expect("task response has no id")
    }
}

/// Builds a multipart body with a single file field
pub fn multipart_body(boundary: &str, field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
