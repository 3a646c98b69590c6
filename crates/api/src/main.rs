use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use app_template_api::{
    app::create_app,
    config::Config,
    middleware::{init_metrics, logging::init_logging},
    services::ConfiguredEmailProvider,
};
use domain::services::UnitOfWorkFactory;
use persistence::{MemoryStore, PgUnitOfWorkFactory};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    init_logging(&config.logging);
    init_metrics()?;

    info!("Starting App Template API v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn UnitOfWorkFactory> = if config.database.is_memory() {
        info!("Using the in-memory store; data is lost on shutdown");
        Arc::new(MemoryStore::seeded())
    } else {
        let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

        info!("Running database migrations...");
        sqlx::migrate!("../persistence/src/migrations")
            .run(&pool)
            .await?;
        info!("Migrations completed");

        Arc::new(PgUnitOfWorkFactory::new(pool))
    };

    let email_provider = ConfiguredEmailProvider::from_config(&config.email)?;
    info!(
        provider = email_provider.provider_name(),
        enabled = email_provider.is_enabled(),
        "Email provider configured"
    );

    let addr = config.socket_addr()?;
    let app = create_app(config, store, Arc::new(email_provider));

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
