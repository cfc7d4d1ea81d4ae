//! Integration tests for store and product ownership.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The server running
//!
//! Run with: cargo test -p ipobre-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::{Method, StatusCode};
use serde_json::json;

use ipobre_integration_tests::{Api, TEST_PASSWORD};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_login_returns_working_token() {
    let api = Api::new();
    let account = api.register("customer").await;

    let (status, body) = api
        .send(
            Method::POST,
            "/api/users/login",
            None,
            Some(&json!({ "email": account.email, "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    let (status, profile) = api
        .send(Method::GET, "/api/users/profile", Some(token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], account.email.as_str());
    assert_eq!(profile["role"], "customer");
    assert!(profile.get("passwordHash").is_none());
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_login_wrong_password_unauthorized() {
    let api = Api::new();
    let account = api.register("customer").await;

    let (status, _) = api
        .send(
            Method::POST,
            "/api/users/login",
            None,
            Some(&json!({ "email": account.email, "password": "not-the-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_customer_cannot_create_store() {
    let api = Api::new();
    let customer = api.register("customer").await;

    let (status, _) = api
        .send(
            Method::POST,
            "/api/stores",
            Some(&customer.token),
            Some(&json!({ "name": "Nope", "category": "lanches" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_product_mutation_requires_store_owner() {
    let api = Api::new();
    let owner = api.register("store").await;
    let store_id = api.create_store(&owner).await;
    let product_id = api.create_product(&owner, store_id, "8.50").await;

    let rival = api.register("store").await;
    let path = format!("/api/products/{product_id}");

    let (status, _) = api
        .send(
            Method::PUT,
            &path,
            Some(&rival.token),
            Some(&json!({ "price": "0.01" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = api.send(Method::DELETE, &path, Some(&rival.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = api
        .send(
            Method::POST,
            "/api/products",
            Some(&rival.token),
            Some(&json!({ "storeId": store_id, "name": "Intruso", "price": "1.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = api
        .send(
            Method::PUT,
            &path,
            Some(&owner.token),
            Some(&json!({ "price": "9.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], "9.00");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_store_update_hidden_from_non_owner() {
    let api = Api::new();
    let owner = api.register("store").await;
    let store_id = api.create_store(&owner).await;
    let rival = api.register("store").await;

    let (status, _) = api
        .send(
            Method::PUT,
            &format!("/api/stores/{store_id}"),
            Some(&rival.token),
            Some(&json!({ "name": "Hijacked" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = api
        .send(Method::GET, &format!("/api/stores/{store_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Pastelaria Teste");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_store_menu_lists_products() {
    let api = Api::new();
    let owner = api.register("store").await;
    let store_id = api.create_store(&owner).await;
    let product_id = api.create_product(&owner, store_id, "4.00").await;

    let (status, body) = api
        .send(
            Method::GET,
            &format!("/api/products/store/{store_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![product_id]);
}
