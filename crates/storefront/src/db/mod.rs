//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `hw_storefront`
//!
//! ## Tables
//!
//! - `cart_sessions` - One row per cart scope (anonymous or customer)
//! - `cart_line_items` - Configured cabinets, owned by a session
//! - `sessions` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run
//! out-of-band (`psql -f`, or your deploy tooling of choice).

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub mod carts;

pub use carts::PgCartStore;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
