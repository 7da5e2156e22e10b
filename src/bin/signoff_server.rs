//! Serves the product sign-off webhook endpoints.
//!
//! Configuration comes from flags or environment variables; run
//! `signoff-server --help` for the full list. The database schema in
//! `migrations/` must be applied before the server starts.

use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use product_signoff::config::AppConfig;
use product_signoff::integration::adapters::http::GitHubClient;
use product_signoff::integration::adapters::postgres::PostgresIntegrationRepository;
use product_signoff::reconciler::{EventReconciler, InboundEvents};
use product_signoff::review::adapters::postgres::PostgresReviewStore;
use product_signoff::telemetry::init_tracing;
use product_signoff::webhook::{WebhookState, router};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort server startup or shutdown.
#[derive(Debug, Error)]
enum ServerError {
    #[error("logging setup failed: {0}")]
    Telemetry(#[source] BoxError),
    #[error(transparent)]
    Config(#[from] product_signoff::config::ConfigError),
    #[error("database pool setup failed: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("outbound client setup failed: {0}")]
    Client(#[from] product_signoff::integration::ports::ExternalApiError),
    #[error("listener failed: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    init_tracing().map_err(ServerError::Telemetry)?;
    let config = AppConfig::load()?;
    info!(?config, "starting signoff-server");

    let pool = Pool::builder()
        .max_size(config.database_pool_size)
        .build(ConnectionManager::<PgConnection>::new(&config.database_url))?;
    let registry = Arc::new(PostgresIntegrationRepository::new(pool.clone()));
    let store = Arc::new(PostgresReviewStore::new(pool));
    let code_review = Arc::new(GitHubClient::new(config.github.clone())?);

    let reconciler: Arc<dyn InboundEvents> = Arc::new(EventReconciler::new(
        registry,
        store,
        code_review,
        Arc::new(DefaultClock),
        config.reconciler.clone(),
    ));
    let app = router(WebhookState::new(reconciler, config.webhook.clone()));

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    info!(address = %config.bind_address, "listening for webhook deliveries");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("signoff-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
