use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use marketchat::adapters::{
    build_router, postgres, AppServices, JwtSessionValidator, PostgresCatalog,
    PostgresConversationStore, RoomManager,
};
use marketchat::config::{AppConfig, ConfigError, ValidationError};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config);

    tracing::info!(
        environment = ?config.server.environment,
        database = %config.database.redacted_url(),
        "Starting marketchat"
    );

    let pool = postgres::connect(&config.database).await?;
    if config.database.run_migrations {
        postgres::migrate(&pool).await?;
        tracing::info!("Migrations applied");
    }

    let catalog = Arc::new(PostgresCatalog::new(pool.clone()));
    let services = AppServices {
        products: catalog.clone(),
        users: catalog,
        store: Arc::new(PostgresConversationStore::new(pool)),
        sessions: Arc::new(JwtSessionValidator::from_config(&config.auth)),
        rooms: Arc::new(RoomManager::new()),
    };

    let app = build_router(services, &config);
    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}
