//! Integration tests for registration, login and bearer authentication.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p shoppy-server)

use reqwest::{Client, StatusCode};
use serde_json::json;

use shoppy_integration_tests::{api_url, json_body, register_user};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_register_returns_token_and_user() {
    let client = Client::new();
    let user = register_user(&client).await;
    assert!(!user.token.is_empty());

    let resp = client
        .get(api_url("/auth/me"))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to fetch current user");
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["username"], user.username.as_str());
    assert!(body["data"]["user"].get("passwordHash").is_none());
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_duplicate_registration_is_rejected() {
    let client = Client::new();
    let user = register_user(&client).await;

    let resp = client
        .post(api_url("/auth/register"))
        .json(&json!({
            "email": user.email,
            "username": user.username,
            "password": user.password,
        }))
        .send()
        .await
        .expect("Failed to send registration");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(resp).await["success"], false);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_login_by_username_or_email() {
    let client = Client::new();
    let user = register_user(&client).await;

    for identifier in [&user.username, &user.email] {
        let resp = client
            .post(api_url("/auth/login"))
            .json(&json!({ "emailOrUsername": identifier, "password": user.password }))
            .send()
            .await
            .expect("Failed to log in");
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["message"], "Login successful");
        assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    }
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_wrong_password_is_unauthorized() {
    let client = Client::new();
    let user = register_user(&client).await;

    let resp = client
        .post(api_url("/auth/login"))
        .json(&json!({ "emailOrUsername": user.username, "password": "not-the-password" }))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_missing_token_is_unauthorized() {
    let client = Client::new();
    for path in ["/auth/me", "/cart", "/chat/sessions", "/purchases"] {
        let resp = client
            .get(api_url(path))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
}
