//! Seed the database with a small demo marketplace.
//!
//! Creates one account per role, an open store owned by the store account,
//! and a handful of products, so the full order flow can be exercised
//! against a fresh database.
//!
//! All demo accounts share the password passed on the command line.

use tracing::{info, warn};

use ipobre_core::{Email, Money, UserRole};
use ipobre_server::db::users::CreateUser;
use ipobre_server::db::{self, ProductRepository, StoreRepository, UserRepository};
use ipobre_server::models::{Address, NewProduct, NewStore};
use ipobre_server::services::auth::hash_password;

/// Demo accounts: (name, email, role).
const DEMO_USERS: [(&str, &str, UserRole); 3] = [
    ("Cliente Demo", "cliente@ipobre.dev", UserRole::Customer),
    ("Loja Demo", "loja@ipobre.dev", UserRole::Store),
    ("Entregador Demo", "entregador@ipobre.dev", UserRole::Driver),
];

/// Demo menu: (name, category, price in centavos).
const DEMO_PRODUCTS: [(&str, &str, u32); 4] = [
    ("X-Burguer", "lanches", 1800),
    ("X-Salada", "lanches", 2000),
    ("Batata Frita", "acompanhamentos", 1200),
    ("Refrigerante Lata", "bebidas", 600),
];

fn demo_address() -> Address {
    Address {
        street: "Rua das Flores".to_string(),
        number: "100".to_string(),
        complement: None,
        neighborhood: "Centro".to_string(),
        city: "São Paulo".to_string(),
        state: "SP".to_string(),
        zip_code: "01000-000".to_string(),
    }
}

/// Insert the demo marketplace.
///
/// Does nothing if the demo customer already exists.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the password is rejected
/// by the hasher, or any insert fails.
pub async fn demo(password: &str) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url().ok_or("DELIVERY_DATABASE_URL not set")?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let users = UserRepository::new(&pool);
    let customer_email = Email::parse(DEMO_USERS[0].1)?;
    if users.get_password_hash(&customer_email).await?.is_some() {
        warn!(email = %customer_email, "Demo data already present, skipping");
        return Ok(());
    }

    let password_hash = hash_password(password)?;
    let address = demo_address();

    let mut store_owner = None;
    for (name, email, role) in DEMO_USERS {
        let email = Email::parse(email)?;
        let user = users
            .create(CreateUser {
                name,
                email: &email,
                password_hash: &password_hash,
                phone: Some("11999990000"),
                address: Some(&address),
                role,
            })
            .await?;
        info!(id = %user.id, email = %email, role = %role, "Created user");

        if role == UserRole::Store {
            store_owner = Some(user.id);
        }
    }
    let owner = store_owner.ok_or("store account was not created")?;

    let store = StoreRepository::new(&pool)
        .create(
            owner,
            &NewStore {
                name: "Lanchonete do Pobre".to_string(),
                category: "lanches".to_string(),
                description: Some("Lanches baratos e rápidos".to_string()),
                logo: None,
                cover_image: None,
                address: Some(address),
                opening_hours: None,
                is_open: true,
                delivery_fee: Money::from_centavos(500),
                minimum_order: Some(Money::from_centavos(1000)),
            },
        )
        .await?;
    info!(id = %store.id, name = %store.name, "Created store");

    let products = ProductRepository::new(&pool);
    for (name, category, price) in DEMO_PRODUCTS {
        let product = products
            .create(&NewProduct {
                store_id: store.id,
                name: name.to_string(),
                price: Money::from_centavos(price),
                description: None,
                image: None,
                category: Some(category.to_string()),
                ingredients: Vec::new(),
                available: true,
                preparation_time: Some(15),
                promotional_price: None,
            })
            .await?;
        info!(id = %product.id, name = %product.name, price = %product.price, "Created product");
    }

    info!("Seeding complete!");
    info!("  Accounts: {}", DEMO_USERS.len());
    info!("  Products: {}", DEMO_PRODUCTS.len());
    Ok(())
}
