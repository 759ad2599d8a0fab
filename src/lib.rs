pub mod config;
pub mod discounts {
    pub mod evaluator;
}
pub mod domain {
    pub mod booking;
    pub mod discount;
    pub mod unit;
}
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod admin;
        pub mod bookings;
        pub mod ops;
        pub mod units;
    }
    pub mod middleware {
        pub mod admin_auth;
        pub mod rate_limit;
    }
}
pub mod ledger;
pub mod repo {
    pub mod bookings_repo;
    pub mod catalog_repo;
    pub mod discounts_repo;
    pub mod outbox_repo;
    pub mod verification_repo;
}
pub mod service {
    pub mod booking_service;
    pub mod expiry_reaper;
    pub mod lifecycle;
    pub mod outbox_relay;
    pub mod verification_worker;
}

#[derive(Clone)]
pub struct AppState {
    pub booking_service: service::booking_service::BookingService,
    pub catalog_repo: repo::catalog_repo::CatalogRepo,
    pub discounts_repo: repo::discounts_repo::DiscountsRepo,
    pub reaper: service::expiry_reaper::ExpiryReaper,
    pub redis_client: redis::Client,
    pub pool: sqlx::PgPool,
}
