//! Integration tests for PIX settlement through the signed webhook.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The server running in sandbox PIX mode
//! - `PIX_WEBHOOK_SECRET` matching the server
//!
//! Run with: cargo test -p ipobre-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::{Method, StatusCode};
use serde_json::json;

use ipobre_integration_tests::{Api, Marketplace};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_webhook_settles_once() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;

    let (status, body) = api.webhook(market.tx_id(), "CONCLUIDA").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "processed": true }));

    // Replay is acknowledged but changes nothing.
    let (status, body) = api.webhook(market.tx_id(), "CONCLUIDA").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "processed": false }));

    let (status, body) = api
        .send(
            Method::GET,
            &format!("/api/payments/check-status/{}", market.order_id()),
            Some(&market.customer.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paymentStatus"], "paid");
    assert_eq!(body["orderStatus"], "paid");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_webhook_unknown_txid_not_found() {
    let api = Api::new();
    let (status, _) = api
        .webhook("ffffffffffffffffffffffffffffffff", "CONCLUIDA")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_webhook_forged_signature_rejected() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;

    let status = api
        .request(Method::POST, "/api/payments/pix-webhook", None)
        .header("x-pix-timestamp", chrono::Utc::now().timestamp().to_string())
        .header("x-pix-signature", format!("v1={}", "0".repeat(64)))
        .json(&json!({ "txId": market.tx_id(), "status": "CONCLUIDA" }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = api
        .send(
            Method::GET,
            &format!("/api/payments/check-status/{}", market.order_id()),
            Some(&market.customer.token),
            None,
        )
        .await;
    assert_eq!(body["paymentStatus"], "pending");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_refund_cancels_paid_order() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;

    let (status, _) = api.webhook(market.tx_id(), "CONCLUIDA").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = api.webhook(market.tx_id(), "DEVOLVIDA").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "processed": true }));

    let (_, body) = api
        .send(
            Method::GET,
            &format!("/api/payments/check-status/{}", market.order_id()),
            Some(&market.customer.token),
            None,
        )
        .await;
    assert_eq!(body["paymentStatus"], "refunded");
    assert_eq!(body["orderStatus"], "cancelled");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_mock_payment_settles_in_sandbox() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;

    let (status, body) = api
        .send(
            Method::POST,
            &format!("/api/payments/mock-complete-payment/{}", market.order_id()),
            Some(&market.customer.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], true);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_create_pix_refused_once_paid() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;

    let path = format!("/api/payments/create-pix/{}", market.order_id());
    let (status, body) = api
        .send(Method::POST, &path, Some(&market.customer.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["pixCode"].as_str().is_some());

    let (status, _) = api.webhook(market.tx_id(), "CONCLUIDA").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = api
        .send(Method::POST, &path, Some(&market.customer.token), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_payment_after_cancellation_flags_refund() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;

    let status = api
        .set_status(&market.customer, market.order_id(), "cancelled")
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = api.webhook(market.tx_id(), "CONCLUIDA").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "processed": true, "refundRequired": true }));

    let (_, body) = api
        .send(
            Method::GET,
            &format!("/api/payments/check-status/{}", market.order_id()),
            Some(&market.customer.token),
            None,
        )
        .await;
    assert_eq!(body["paymentStatus"], "paid");
    assert_eq!(body["orderStatus"], "cancelled");
}
