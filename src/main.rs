use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;
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
use booking_engine::service::outbox_relay::OutboxRelay;
use booking_engine::service::verification_worker::VerificationWorker;
use booking_engine::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let redis_client = redis::Client::open(cfg.redis_url.clone())?;

    let bookings_repo = BookingsRepo { pool: pool.clone() };
    let catalog_repo = CatalogRepo { pool: pool.clone() };
    let discounts_repo = DiscountsRepo { pool: pool.clone() };
    let outbox_repo = OutboxRepo { pool: pool.clone() };
    let verification_repo = VerificationRepo { pool: pool.clone() };
    let ledger = Arc::new(PgInventoryLedger { pool: pool.clone() });
    let verifier = verifier_from_env();

    let booking_service = BookingService {
        pool: pool.clone(),
        bookings_repo,
        catalog_repo: catalog_repo.clone(),
        discounts_repo: discounts_repo.clone(),
        outbox_repo: outbox_repo.clone(),
        verification_repo: verification_repo.clone(),
        ledger,
        verifier,
        hold_ttl_minutes: cfg.hold_ttl_minutes,
        max_payment_attempts: cfg.max_payment_attempts,
        min_payable_minor: cfg.min_payable_minor,
    };

    let reaper = ExpiryReaper {
        booking_service: booking_service.clone(),
        interval: std::time::Duration::from_secs(cfg.reaper_interval_secs),
        batch_size: cfg.reaper_batch_size,
    };
    tokio::spawn(reaper.clone().run());

    let relay = OutboxRelay {
        outbox_repo,
        redis_client: redis::Client::open(cfg.redis_url.clone())?,
        stream_key: cfg.stream_key.clone(),
        poll_interval: std::time::Duration::from_millis(200),
    };
    tokio::spawn(relay.run());

    let verification_worker = VerificationWorker {
        verification_repo,
        booking_service: booking_service.clone(),
        interval: std::time::Duration::from_secs(30),
        max_attempts: 10,
    };
    tokio::spawn(verification_worker.run());

    let state = AppState {
        booking_service,
        catalog_repo,
        discounts_repo,
        reaper,
        redis_client,
        pool,
    };

    let admin_token = cfg.admin_token.clone();
    let admin_routes = Router::new()
        .route(
            "/bookings/:booking_id/confirm",
            post(booking_engine::http::handlers::bookings::confirm_booking),
        )
        .route(
            "/admin/bookings/:booking_id",
            delete(booking_engine::http::handlers::admin::cancel_booking),
        )
        .route(
            "/admin/units/:unit_id",
            put(booking_engine::http::handlers::admin::upsert_unit),
        )
        .route(
            "/admin/discounts/:code",
            put(booking_engine::http::handlers::admin::upsert_discount),
        )
        .route(
            "/admin/sweep",
            post(booking_engine::http::handlers::admin::run_sweep),
        )
        .layer(from_fn_with_state(
            admin_token,
            booking_engine::http::middleware::admin_auth::require_admin_token,
        ));

    let app = Router::new()
        .route("/health", get(booking_engine::http::handlers::bookings::health))
        .route("/bookings", post(booking_engine::http::handlers::bookings::create_booking))
        .route(
            "/bookings/:booking_id",
            get(booking_engine::http::handlers::bookings::get_booking)
                .delete(booking_engine::http::handlers::bookings::cancel_booking),
        )
        .route(
            "/bookings/:booking_id/payment",
            post(booking_engine::http::handlers::bookings::submit_payment),
        )
        .route(
            "/units/:unit_id/availability",
            get(booking_engine::http::handlers::units::get_availability),
        )
        .route("/ops/readiness", get(booking_engine::http::handlers::ops::readiness))
        .route("/ops/liveness", get(booking_engine::http::handlers::ops::liveness))
        .merge(admin_routes)
        .layer(from_fn_with_state(
            booking_engine::http::middleware::rate_limit::RateLimitState {
                redis_client: redis::Client::open(cfg.redis_url.clone())?,
                max_per_minute: cfg.rate_limit_per_minute,
            },
            booking_engine::http::middleware::rate_limit::enforce,
        ))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
