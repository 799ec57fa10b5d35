//! Integration tests for the cart and checkout endpoints.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p shoppy-server)

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use shoppy_integration_tests::{TestUser, api_url, json_body, register_user};

/// Test helper: add a product to the user's cart.
async fn add_item(client: &Client, user: &TestUser, product_id: &str, price: Value) -> Value {
    let resp = client
        .post(api_url("/cart/add"))
        .bearer_auth(&user.token)
        .json(&json!({
            "productId": product_id,
            "productName": "Burgundy T-Shirt",
            "price": price,
            "quantity": 2,
        }))
        .send()
        .await
        .expect("Failed to add cart item");
    assert_eq!(resp.status(), StatusCode::OK);
    json_body(resp).await
}

async fn cart(client: &Client, user: &TestUser) -> Value {
    let resp = client
        .get(api_url("/cart"))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to fetch cart");
    assert_eq!(resp.status(), StatusCode::OK);
    json_body(resp).await
}

// ============================================================================
// Cart Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_adding_same_product_increments_quantity() {
    let client = Client::new();
    let user = register_user(&client).await;

    let first = add_item(&client, &user, "gid://shopify/Product/1", json!(25.0)).await;
    assert_eq!(first["message"], "Item added to cart");

    let second = add_item(&client, &user, "gid://shopify/Product/1", json!("25.00")).await;
    assert_eq!(second["message"], "Item quantity updated in cart");
    assert_eq!(second["data"]["item"]["quantity"], 4);

    let body = cart(&client, &user).await;
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"]["total"], 100.0);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_invalid_quantity_is_rejected() {
    let client = Client::new();
    let user = register_user(&client).await;
    let added = add_item(&client, &user, "gid://shopify/Product/2", json!(10)).await;
    let item_id = &added["data"]["item"]["id"];

    let resp = client
        .put(api_url(&format!("/cart/{item_id}")))
        .bearer_auth(&user.token)
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .expect("Failed to update quantity");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_items_are_scoped_to_owner() {
    let client = Client::new();
    let owner = register_user(&client).await;
    let other = register_user(&client).await;
    let added = add_item(&client, &owner, "gid://shopify/Product/3", json!(12.5)).await;
    let item_id = &added["data"]["item"]["id"];

    let resp = client
        .delete(api_url(&format!("/cart/{item_id}")))
        .bearer_auth(&other.token)
        .send()
        .await
        .expect("Failed to send delete");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body = cart(&client, &owner).await;
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_clear_resets_count() {
    let client = Client::new();
    let user = register_user(&client).await;
    add_item(&client, &user, "gid://shopify/Product/4", json!(5)).await;

    let resp = client
        .delete(api_url("/cart"))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to clear cart");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(api_url("/cart/count"))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to fetch count");
    let body = json_body(resp).await;
    assert_eq!(body["data"]["count"], 0);
}

// ============================================================================
// Checkout Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_checkout_moves_cart_into_purchases() {
    let client = Client::new();
    let user = register_user(&client).await;
    // Two units each: (12.00 + 10.99) * 2.
    add_item(&client, &user, "gid://shopify/Product/5", json!(12.00)).await;
    add_item(&client, &user, "gid://shopify/Product/6", json!(10.99)).await;

    let resp = client
        .post(api_url("/checkout"))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to check out");
    assert_eq!(resp.status(), StatusCode::OK);
    let receipt = json_body(resp).await;
    assert_eq!(receipt["message"], "Checkout completed successfully");
    assert_eq!(receipt["data"]["totalAmount"], json!(45.98));

    let order_id = receipt["data"]["orderId"].as_str().expect("orderId missing");
    let purchases = receipt["data"]["purchases"].as_array().expect("purchases missing");
    assert_eq!(purchases.len(), 2);
    assert!(purchases.iter().all(|p| p["orderId"] == order_id));

    let body = cart(&client, &user).await;
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(0));

    let resp = client
        .get(api_url("/purchases"))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to fetch purchases");
    let history = json_body(resp).await;
    assert_eq!(history["data"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_checkout_of_empty_cart_is_rejected() {
    let client = Client::new();
    let user = register_user(&client).await;

    let resp = client
        .post(api_url("/checkout"))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to check out");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
