//! Common test utilities for integration tests
//!
//! Builds the full router on top of an in-memory store with cheap Argon2
//! parameters and drives it in-process, without binding a socket.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use bookvault_api::{
    app::{build_router, AppState},
    config::Config,
};
use bookvault_shared::store::memory::MemoryStore;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tower::Service as _;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing the router and the state behind it
pub struct TestContext {
    pub app: Router,
    pub state: AppState,
}

/// Decoded response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestContext {
    /// Context with authentication enabled
    pub fn new() -> Self {
        Self::with_vars(&[])
    }

    /// Context with authentication disabled
    pub fn without_auth() -> Self {
        Self::with_vars(&[("AUTH_ENABLED", "false")])
    }

    /// Context with extra configuration variables
    pub fn with_vars(extra: &[(&str, &str)]) -> Self {
        let mut vars: HashMap<String, String> = [
            ("JWT_SECRET", JWT_SECRET),
            ("ARGON2_MEMORY_KIB", "1024"),
            ("ARGON2_ITERATIONS", "1"),
            ("ARGON2_PARALLELISM", "1"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }

        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let state = AppState::new(Arc::new(MemoryStore::new()), config).unwrap();
        let app = build_router(state.clone());

        Self { app, state }
    }

    /// Sends a request with an optional `Authorization` value and JSON body
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        authorization: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send_raw(builder.body(body).unwrap()).await
    }

    /// Sends a prepared request
    pub async fn send_raw(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().call(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Registers a principal and returns its id
    pub async fn register(&self, email: &str, password: &str) -> i64 {
        let response = self
            .send(
                Method::POST,
                "/api/v1/register",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_i64().unwrap()
    }

    /// Logs in and returns the token
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .send(
                Method::POST,
                "/api/v1/login",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["token"].as_str().unwrap().to_string()
    }

    /// Registers and logs in, returning `(id, "Bearer <token>")`
    pub async fn signed_in(&self, email: &str, password: &str) -> (i64, String) {
        let id = self.register(email, password).await;
        let token = self.login(email, password).await;
        (id, format!("Bearer {}", token))
    }
}
