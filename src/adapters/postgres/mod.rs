//! PostgreSQL adapters - Database implementations for the chat ports.
//!
//! - `PostgresConversationStore` - conversations and their message logs
//! - `PostgresCatalog` - product and user profile reads

mod catalog;
mod conversation_store;

pub use catalog::PostgresCatalog;
pub use conversation_store::PostgresConversationStore;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;

/// Opens a connection pool sized and timed from configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .connect(&config.url)
        .await
}

/// Applies the embedded schema migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
