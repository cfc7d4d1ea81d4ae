//! Integration tests for iPobre.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! cargo run -p ipobre-cli -- migrate
//!
//! # Start the server (sandbox PIX mode, ready-claim policy)
//! cargo run -p ipobre-server
//!
//! # Run integration tests
//! cargo test -p ipobre-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `IPOBRE_BASE_URL` - Server under test (default: `http://localhost:3000`)
//! - `PIX_WEBHOOK_SECRET` - Must match the server's webhook secret
//!
//! # Test Files
//!
//! - `orders` - Placement, totals and the lifecycle
//! - `claims` - Concurrent driver claims
//! - `payments` - Signed webhook, replay and refunds
//! - `catalog` - Store and product ownership

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};
use uuid::Uuid;

use ipobre_server::pix::webhook::{SIGNATURE_HEADER, TIMESTAMP_HEADER, sign};

/// Password used by every account the tests create.
pub const TEST_PASSWORD: &str = "integration-pass-123";

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("IPOBRE_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Webhook secret shared with the server.
#[must_use]
pub fn webhook_secret() -> SecretString {
    SecretString::from(
        std::env::var("PIX_WEBHOOK_SECRET").expect("PIX_WEBHOOK_SECRET must be set for tests"),
    )
}

/// A delivery address accepted by every endpoint that takes one.
#[must_use]
pub fn address() -> Value {
    json!({
        "street": "Rua Augusta",
        "number": "1500",
        "neighborhood": "Consolação",
        "city": "São Paulo",
        "state": "SP",
        "zipCode": "01304-001"
    })
}

/// A registered account and its bearer token.
#[derive(Debug, Clone)]
pub struct Account {
    pub email: String,
    pub token: String,
}

/// HTTP client bound to the server under test.
#[derive(Debug, Clone)]
pub struct Api {
    client: Client,
    base_url: String,
}

impl Default for Api {
    fn default() -> Self {
        Self::new()
    }
}

impl Api {
    /// Create a client for [`base_url`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: base_url(),
        }
    }

    /// Start a request, optionally authenticated.
    #[must_use]
    pub fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a JSON request and return the status with the parsed body.
    ///
    /// Bodies that are not JSON come back as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> (StatusCode, Value) {
        let mut builder = self.request(method, path, token);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        into_json(builder.send().await.expect("request failed")).await
    }

    /// Register an account with the given role.
    ///
    /// Each registration presents a distinct client address so suites stay
    /// under the per-IP credential rate limit.
    pub async fn register(&self, role: &str) -> Account {
        let email = format!("{role}-{}@test.ipobre.dev", Uuid::new_v4().simple());
        let (status, body) = into_json(
            self.request(Method::POST, "/api/users/register", None)
                .header("x-forwarded-for", random_ip())
                .json(&json!({
                    "name": format!("Test {role}"),
                    "email": email,
                    "password": TEST_PASSWORD,
                    "phone": "11988887777",
                    "address": address(),
                    "role": role,
                }))
                .send()
                .await
                .expect("register request failed"),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let token = body["token"]
            .as_str()
            .expect("register response carries a token")
            .to_string();
        Account { email, token }
    }

    /// Create an open store with a R$ 5.00 delivery fee. Returns its id.
    pub async fn create_store(&self, owner: &Account) -> i64 {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/stores",
                Some(&owner.token),
                Some(&json!({
                    "name": "Pastelaria Teste",
                    "category": "pastel",
                    "isOpen": true,
                    "deliveryFee": "5.00",
                    "address": address(),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create store failed: {body}");
        body["id"].as_i64().expect("store id")
    }

    /// Create a product in a store. Returns its id.
    pub async fn create_product(&self, owner: &Account, store_id: i64, price: &str) -> i64 {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/products",
                Some(&owner.token),
                Some(&json!({
                    "storeId": store_id,
                    "name": "Pastel de Queijo",
                    "price": price,
                    "category": "pastel",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product failed: {body}");
        body["id"].as_i64().expect("product id")
    }

    /// Place an order for `quantity` units of one product.
    pub async fn place_order(
        &self,
        customer: &Account,
        store_id: i64,
        product_id: i64,
        quantity: u32,
    ) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/orders",
                Some(&customer.token),
                Some(&json!({
                    "storeId": store_id,
                    "items": [{ "productId": product_id, "quantity": quantity }],
                    "deliveryAddress": address(),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "place order failed: {body}");
        body
    }

    /// Change an order's status through the generic status route.
    pub async fn set_status(&self, actor: &Account, order_id: i64, status: &str) -> StatusCode {
        self.send(
            Method::PUT,
            &format!("/api/orders/{order_id}/status"),
            Some(&actor.token),
            Some(&json!({ "status": status })),
        )
        .await
        .0
    }

    /// Deliver a provider notification signed with [`webhook_secret`].
    pub async fn webhook(&self, tx_id: &str, status: &str) -> (StatusCode, Value) {
        let body = json!({ "txId": tx_id, "status": status }).to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(&webhook_secret(), &timestamp, body.as_bytes());

        into_json(
            self.request(Method::POST, "/api/payments/pix-webhook", None)
                .header(TIMESTAMP_HEADER, timestamp)
                .header(SIGNATURE_HEADER, signature)
                .header("content-type", "application/json")
                .body(body)
                .send()
                .await
                .expect("webhook request failed"),
        )
        .await
    }
}

/// A customer, a store with one product, and a placed order.
#[derive(Debug, Clone)]
pub struct Marketplace {
    pub customer: Account,
    pub owner: Account,
    pub store_id: i64,
    pub product_id: i64,
    pub order: Value,
}

impl Marketplace {
    /// Set up a store selling one R$ 10.00 product and an order of two units.
    pub async fn with_order(api: &Api) -> Self {
        let customer = api.register("customer").await;
        let owner = api.register("store").await;
        let store_id = api.create_store(&owner).await;
        let product_id = api.create_product(&owner, store_id, "10.00").await;
        let order = api.place_order(&customer, store_id, product_id, 2).await;

        Self {
            customer,
            owner,
            store_id,
            product_id,
            order,
        }
    }

    /// Id of the placed order.
    #[must_use]
    pub fn order_id(&self) -> i64 {
        self.order["id"].as_i64().expect("order id")
    }

    /// Provider transaction id of the placed order.
    #[must_use]
    pub fn tx_id(&self) -> &str {
        self.order["txId"].as_str().expect("order txId")
    }

    /// Pay the order and have the store walk it to `ready`.
    pub async fn make_ready(&self, api: &Api) {
        let (status, _) = api.webhook(self.tx_id(), "CONCLUIDA").await;
        assert_eq!(status, StatusCode::OK);
        for next in ["confirmed", "preparing", "ready"] {
            assert_eq!(
                api.set_status(&self.owner, self.order_id(), next).await,
                StatusCode::OK,
                "store could not move order to {next}"
            );
        }
    }
}

async fn into_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

fn random_ip() -> String {
    let [a, b, c, ..] = Uuid::new_v4().into_bytes();
    format!("10.{a}.{b}.{c}")
}
