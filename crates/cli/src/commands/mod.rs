//! CLI subcommand implementations.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Resolve the database URL the same way the server does:
/// `DELIVERY_DATABASE_URL`, falling back to `DATABASE_URL`.
pub fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("DELIVERY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
