//! Integration tests for order placement and the order lifecycle.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The server running in sandbox PIX mode with the ready-claim policy
//! - `PIX_WEBHOOK_SECRET` matching the server
//!
//! Run with: cargo test -p ipobre-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::{Method, StatusCode};
use serde_json::json;

use ipobre_integration_tests::{Api, Marketplace, address};

// ============================================================================
// Placement
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_order_totals_use_catalog_prices() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;

    // 2 x 10.00 + 5.00 delivery
    assert_eq!(market.order["subtotal"], "20.00");
    assert_eq!(market.order["deliveryFee"], "5.00");
    assert_eq!(market.order["total"], "25.00");
    assert_eq!(market.order["status"], "pending");
    assert_eq!(market.order["paymentStatus"], "pending");
    assert_eq!(market.order["items"][0]["unitPrice"], "10.00");
    assert!(market.order["pixCode"].as_str().is_some_and(|c| !c.is_empty()));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_order_rejects_product_from_other_store() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;

    let other_owner = api.register("store").await;
    let other_store = api.create_store(&other_owner).await;
    let foreign_product = api.create_product(&other_owner, other_store, "3.00").await;

    let (status, _) = api
        .send(
            Method::POST,
            "/api/orders",
            Some(&market.customer.token),
            Some(&json!({
                "storeId": market.store_id,
                "items": [{ "productId": foreign_product, "quantity": 1 }],
                "deliveryAddress": address(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_order_rejects_empty_items() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;

    let (status, _) = api
        .send(
            Method::POST,
            "/api/orders",
            Some(&market.customer.token),
            Some(&json!({
                "storeId": market.store_id,
                "items": [],
                "deliveryAddress": address(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_only_customers_place_orders() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;

    let (status, _) = api
        .send(
            Method::POST,
            "/api/orders",
            Some(&market.owner.token),
            Some(&json!({
                "storeId": market.store_id,
                "items": [{ "productId": market.product_id, "quantity": 1 }],
                "deliveryAddress": address(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ============================================================================
// Visibility
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_unrelated_user_cannot_view_order() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;
    let stranger = api.register("customer").await;

    let path = format!("/api/orders/{}", market.order_id());

    let (status, _) = api.send(Method::GET, &path, Some(&stranger.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = api
        .send(Method::GET, &path, Some(&market.customer.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"].as_i64(), Some(market.order_id()));

    let (status, _) = api
        .send(Method::GET, &path, Some(&market.owner.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_store_orders_lists_placed_order() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;

    let (status, body) = api
        .send(
            Method::GET,
            "/api/orders/store-orders",
            Some(&market.owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|o| o["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![market.order_id()]);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_full_lifecycle_to_delivered() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;
    market.make_ready(&api).await;

    let driver = api.register("driver").await;
    let (status, body) = api
        .send(
            Method::POST,
            &format!("/api/orders/{}/accept-delivery", market.order_id()),
            Some(&driver.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "delivering");

    for next in ["picked_up", "delivered"] {
        let (status, body) = api
            .send(
                Method::PUT,
                &format!("/api/drivers/update-order-status/{}", market.order_id()),
                Some(&driver.token),
                Some(&json!({ "status": next })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], next);
    }

    let (status, body) = api
        .send(
            Method::GET,
            "/api/drivers/delivery-history",
            Some(&driver.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    // Terminal: nothing moves a delivered order.
    assert_eq!(
        api.set_status(&market.owner, market.order_id(), "cancelled")
            .await,
        StatusCode::CONFLICT
    );
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_customer_cannot_mark_paid() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;

    assert_eq!(
        api.set_status(&market.customer, market.order_id(), "paid")
            .await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_customer_cancels_only_while_pending() {
    let api = Api::new();

    let pending = Marketplace::with_order(&api).await;
    assert_eq!(
        api.set_status(&pending.customer, pending.order_id(), "cancelled")
            .await,
        StatusCode::OK
    );

    let paid = Marketplace::with_order(&api).await;
    let (status, _) = api.webhook(paid.tx_id(), "CONCLUIDA").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        api.set_status(&paid.customer, paid.order_id(), "cancelled")
            .await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_skipping_states_is_rejected() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;

    // pending -> ready is not in the table
    assert_eq!(
        api.set_status(&market.owner, market.order_id(), "ready")
            .await,
        StatusCode::BAD_REQUEST
    );
}
