//! Integration tests for Shoppy.
//!
//! These tests drive a running server over HTTP. They are ignored by default.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! task db:start
//! cargo run -p shoppy-cli -- migrate
//!
//! # Start the server, then run the ignored tests
//! cargo run -p shoppy-server &
//! cargo test -p shoppy-integration-tests -- --ignored
//! ```
//!
//! `SHOPPY_BASE_URL` points the tests at another server
//! (default `http://localhost:3000`).

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("SHOPPY_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Absolute URL for an `/api` path.
#[must_use]
pub fn api_url(path: &str) -> String {
    format!("{}/api{path}", base_url())
}

/// A freshly registered user and their bearer token.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: AuthData,
}

#[derive(Debug, Deserialize)]
struct AuthData {
    token: String,
}

/// Register a user with a unique name.
///
/// # Panics
///
/// Panics if the server rejects the registration or is unreachable.
pub async fn register_user(client: &Client) -> TestUser {
    let suffix = Uuid::new_v4().simple().to_string();
    let username = format!("it_{}", &suffix[..12]);
    let email = format!("{username}@example.com");
    let password = "correct-horse-battery".to_string();

    let resp = client
        .post(api_url("/auth/register"))
        .json(&json!({
            "email": email,
            "username": username,
            "password": password,
        }))
        .send()
        .await
        .expect("Failed to register test user");
    assert!(
        resp.status().is_success(),
        "registration failed: {}",
        resp.status()
    );

    let body: Envelope = resp.json().await.expect("Failed to parse auth response");
    TestUser {
        username,
        email,
        password,
        token: body.data.token,
    }
}

/// Read a response body as JSON.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn json_body(resp: reqwest::Response) -> Value {
    resp.json().await.expect("Failed to parse JSON body")
}
