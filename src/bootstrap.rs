use std::{sync::Arc, time::Duration};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::{
    adapters::{PaymentGateway, RazorpayGateway},
    api::{auth::JwtVerifier, handler::AppState},
    config::Config,
    error::AppResult,
    ledger::{LedgerRepository, LedgerStore},
    middleware::PaymentRateLimiter,
    payments::{HmacSignatureVerifier, OrderService, SettlementService},
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    // Database pool
    let pool = initialize_database(&config.database_url).await?;
    let ledger: Arc<dyn LedgerStore> = Arc::new(LedgerRepository::new(pool));

    // Payment gateway
    let gateway: Arc<dyn PaymentGateway> = Arc::new(RazorpayGateway::new(config.razorpay.clone())?);
    info!(
        "✅ {} gateway initialized ({}, timeout {:?})",
        gateway.name(),
        config.razorpay.api_url,
        config.razorpay.timeout
    );

    // Completion callbacks are signed with the same key secret used for the API
    let verifier = Arc::new(HmacSignatureVerifier::new(config.razorpay.key_secret.clone()));
    let settings = Arc::new(config.payments.clone());

    let orders = Arc::new(OrderService::new(ledger.clone(), gateway.clone(), settings.clone()));
    let settlement = Arc::new(SettlementService::new(ledger.clone(), gateway, verifier, settings));
    info!("✅ Order and settlement services initialized");

    let auth = Arc::new(JwtVerifier::new(&config.auth)?);

    if config.webhook_signing_secret.is_none() {
        warn!("⚠️  SIGNING_SECRET not set - identity webhooks will be rejected");
    }

    Ok(AppState {
        ledger,
        orders,
        settlement,
        auth,
        rate_limiter: PaymentRateLimiter::per_minute(config.rate_limit_per_minute),
        webhook_secret: config.webhook_signing_secret.clone(),
    })
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await?;

    info!("✓ Database connection established");

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("✓ Migrations completed");

    Ok(pool)
}
