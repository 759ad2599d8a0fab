use anyhow::Result;
use booking_engine::config::AppConfig;
use booking_engine::gateways::verifier_from_env;
use booking_engine::ledger::postgres::PgInventoryLedger;
use booking_engine::repo::bookings_repo::BookingsRepo;
use booking_engine::repo::catalog_repo::CatalogRepo;
use booking_engine::repo::discounts_repo::DiscountsRepo;
use booking_engine::repo::outbox_repo::OutboxRepo;
use booking_engine::repo::verification_repo::VerificationRepo;
use booking_engine::service::booking_service::BookingService;
use booking_engine::service::expiry_reaper::ExpiryReaper;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Standalone sweep worker for deployments that run the reaper apart from
/// the API process. The sweep is idempotent, so running both is harmless.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cfg.database_url)
        .await?;

    let booking_service = BookingService {
        pool: pool.clone(),
        bookings_repo: BookingsRepo { pool: pool.clone() },
        catalog_repo: CatalogRepo { pool: pool.clone() },
        discounts_repo: DiscountsRepo { pool: pool.clone() },
        outbox_repo: OutboxRepo { pool: pool.clone() },
        verification_repo: VerificationRepo { pool: pool.clone() },
        ledger: Arc::new(PgInventoryLedger { pool }),
        verifier: verifier_from_env(),
        hold_ttl_minutes: cfg.hold_ttl_minutes,
        max_payment_attempts: cfg.max_payment_attempts,
        min_payable_minor: cfg.min_payable_minor,
    };

    let reaper = ExpiryReaper {
        booking_service,
        interval: std::time::Duration::from_secs(cfg.reaper_interval_secs),
        batch_size: cfg.reaper_batch_size,
    };
    reaper.run().await;
    Ok(())
}
