//! Shared helpers for API integration tests

#![allow(dead_code)]

use coursedesk::api::{serve, AppState, SharedState};
use coursedesk::store::MemoryStore;
use coursedesk::Config;
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub const TEST_SECRET: &str = "integration-test-secret";

/// An API server bound to an ephemeral port, backed by an in-memory store
pub struct TestServer {
    pub base: String,
    pub client: reqwest::Client,
    pub state: SharedState,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = TEST_SECRET.to_string();
    config.auth.bcrypt_cost = 4;
    config
}

/// Start a server; the listener is bound before this returns
pub async fn start_test_server() -> TestServer {
    let state = AppState::new(test_config(), Arc::new(MemoryStore::new()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    let handle = tokio::spawn({
        let state = state.clone();
        async move {
            let _ = serve(listener, state).await;
        }
    });

    TestServer {
        base: format!("http://{}", addr),
        client: reqwest::Client::new(),
        state,
        handle,
    }
}

impl TestServer {
    /// URL under the /api/auth prefix
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/auth{}", self.base, path)
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Response {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.expect("POST failed")
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("PUT failed")
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.expect("GET failed")
    }

    pub async fn delete(&self, path: &str, token: &str) -> Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("DELETE failed")
    }

    /// Register a user named `username` and return (user document, token)
    pub async fn register(&self, username: &str, role: &str) -> (Value, String) {
        let resp = self
            .post(
                "/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "password123",
                    "role": role,
                }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED, "register {}", username);
        let body: Value = resp.json().await.expect("register body");
        let token = body["token"].as_str().expect("token").to_string();
        (body["user"].clone(), token)
    }
}

/// Status and parsed JSON body
pub async fn status_and_json(resp: Response) -> (StatusCode, Value) {
    let status = resp.status();
    let body = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}
