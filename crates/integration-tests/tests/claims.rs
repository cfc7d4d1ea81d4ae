//! Integration tests for driver delivery claims.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The server running in sandbox PIX mode with the ready-claim policy
//! - `PIX_WEBHOOK_SECRET` matching the server
//!
//! Run with: cargo test -p ipobre-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::{Method, StatusCode};

use ipobre_integration_tests::{Api, Marketplace};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_concurrent_claims_have_one_winner() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;
    market.make_ready(&api).await;

    let mut drivers = Vec::new();
    for _ in 0..5 {
        drivers.push(api.register("driver").await);
    }

    let path = format!("/api/orders/{}/accept-delivery", market.order_id());
    let attempts = drivers.iter().map(|driver| {
        let api = api.clone();
        let path = path.clone();
        let token = driver.token.clone();
        tokio::spawn(async move { api.send(Method::POST, &path, Some(&token), None).await })
    });

    let mut won = 0;
    let mut lost = 0;
    for attempt in attempts.collect::<Vec<_>>() {
        let (status, _) = attempt.await.unwrap();
        match status {
            StatusCode::OK => won += 1,
            StatusCode::CONFLICT => lost += 1,
            other => panic!("unexpected claim status {other}"),
        }
    }

    assert_eq!(won, 1);
    assert_eq!(lost, drivers.len() - 1);

    let (_, order) = api
        .send(
            Method::GET,
            &format!("/api/orders/{}", market.order_id()),
            Some(&market.customer.token),
            None,
        )
        .await;
    assert_eq!(order["status"], "delivering");
    assert!(order["driverId"].as_i64().is_some());
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_claim_before_ready_conflicts() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;
    let driver = api.register("driver").await;

    let (status, _) = api
        .send(
            Method::POST,
            &format!("/api/drivers/accept-order/{}", market.order_id()),
            Some(&driver.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_claim_missing_order_not_found() {
    let api = Api::new();
    let driver = api.register("driver").await;

    let (status, _) = api
        .send(
            Method::POST,
            "/api/orders/2147483647/accept-delivery",
            Some(&driver.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_only_drivers_claim() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;
    market.make_ready(&api).await;

    let (status, _) = api
        .send(
            Method::POST,
            &format!("/api/orders/{}/accept-delivery", market.order_id()),
            Some(&market.customer.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_claimable_order_listed_then_gone() {
    let api = Api::new();
    let market = Marketplace::with_order(&api).await;
    market.make_ready(&api).await;
    let driver = api.register("driver").await;

    let listed = |body: &serde_json::Value| {
        body.as_array()
            .unwrap()
            .iter()
            .any(|o| o["id"].as_i64() == Some(market.order_id()))
    };

    let (status, body) = api
        .send(
            Method::GET,
            "/api/drivers/available-orders",
            Some(&driver.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed(&body));

    let (status, _) = api
        .send(
            Method::POST,
            &format!("/api/drivers/accept-order/{}", market.order_id()),
            Some(&driver.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = api
        .send(
            Method::GET,
            "/api/orders/available-deliveries",
            Some(&driver.token),
            None,
        )
        .await;
    assert!(!listed(&body));

    let (_, active) = api
        .send(Method::GET, "/api/drivers/my-orders", Some(&driver.token), None)
        .await;
    assert!(listed(&active));
}
