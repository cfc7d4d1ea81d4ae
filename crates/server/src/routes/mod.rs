//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                - Liveness
//! GET  /health/ready                          - Readiness (database ping)
//!
//! # Users
//! POST /api/users/register                    - Create account, returns token
//! POST /api/users/login                       - Returns token
//! GET  /api/users/profile                     - Caller's profile
//! PUT  /api/users/profile                     - Update name, phone, address
//!
//! # Stores
//! POST /api/stores                            - Create (store accounts)
//! GET  /api/stores                            - List (?category=&search=)
//! GET  /api/stores/{id}                       - Detail
//! PUT  /api/stores/{id}                       - Update (owner)
//! DELETE /api/stores/{id}                     - Delete (owner)
//!
//! # Products
//! POST /api/products                          - Create (store owner)
//! GET  /api/products/store/{store_id}         - Store menu (?category=)
//! GET  /api/products/search                   - Search (?q=)
//! GET  /api/products/{id}                     - Detail
//! PUT  /api/products/{id}                     - Update (store owner)
//! DELETE /api/products/{id}                   - Delete (store owner)
//!
//! # Orders
//! POST /api/orders                            - Place order + PIX charge
//! GET  /api/orders/my-orders                  - Customer's orders
//! GET  /api/orders/store-orders               - Store owner's orders (?store_id=)
//! GET  /api/orders/available-deliveries       - Claimable orders (drivers)
//! GET  /api/orders/{id}                       - Detail (participants)
//! POST /api/orders/{id}/accept-delivery       - Driver claim
//! PUT  /api/orders/{id}/status                - Status change
//!
//! # Drivers
//! GET  /api/drivers/available-orders          - Claimable orders
//! POST /api/drivers/accept-order/{id}         - Driver claim
//! PUT  /api/drivers/update-order-status/{id}  - picked_up / delivered
//! GET  /api/drivers/my-orders                 - Deliveries in progress
//! GET  /api/drivers/delivery-history          - Completed deliveries
//!
//! # Payments
//! POST /api/payments/create-pix/{order_id}    - (Re)issue charge
//! POST /api/payments/pix-webhook              - Provider notification (HMAC)
//! GET  /api/payments/check-status/{order_id}  - Payment status
//! POST /api/payments/mock-complete-payment/{order_id} - Sandbox only
//! ```

pub mod drivers;
pub mod orders;
pub mod payments;
pub mod products;
pub mod stores;
pub mod users;

use axum::{
    Router,
    routing::{get, post, put},
};
use serde::Serialize;

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Plain confirmation body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    /// Create a confirmation body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .layer(auth_rate_limiter());

    Router::new()
        .merge(credentials)
        .route("/profile", get(users::profile).put(users::update_profile))
}

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index).post(stores::create))
        .route(
            "/{id}",
            get(stores::show)
                .put(stores::update)
                .delete(stores::destroy),
        )
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(products::create))
        .route("/store/{store_id}", get(products::by_store))
        .route("/search", get(products::search))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create))
        .route("/my-orders", get(orders::my_orders))
        .route("/store-orders", get(orders::store_orders))
        .route("/available-deliveries", get(orders::available_deliveries))
        .route("/{id}", get(orders::show))
        .route("/{id}/accept-delivery", post(orders::accept_delivery))
        .route("/{id}/status", put(orders::update_status))
}

/// Create the driver routes router.
pub fn driver_routes() -> Router<AppState> {
    Router::new()
        .route("/available-orders", get(drivers::available_orders))
        .route("/accept-order/{id}", post(drivers::accept_order))
        .route("/update-order-status/{id}", put(drivers::update_order_status))
        .route("/my-orders", get(drivers::my_orders))
        .route("/delivery-history", get(drivers::delivery_history))
}

/// Create the payment routes router.
///
/// The mock settlement route exists only when charges are simulated.
pub fn payment_routes(sandbox: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/create-pix/{order_id}", post(payments::create_pix))
        .route("/pix-webhook", post(payments::pix_webhook))
        .route("/check-status/{order_id}", get(payments::check_status));

    if sandbox {
        router.route(
            "/mock-complete-payment/{order_id}",
            post(payments::mock_complete_payment),
        )
    } else {
        router
    }
}

/// Create all `/api` routes.
pub fn routes(sandbox: bool) -> Router<AppState> {
    Router::new()
        .nest("/api/users", user_routes())
        .nest("/api/stores", store_routes())
        .nest("/api/products", product_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/drivers", driver_routes())
        .nest("/api/payments", payment_routes(sandbox))
}
