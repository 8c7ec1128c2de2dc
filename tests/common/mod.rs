#![allow(dead_code)]

use axum::{Router, routing::get};
use axum_test::TestServer;
use chrono::{DateTime, Duration, Utc};
use shortlink_ttl::api::handlers::{health_handler, redirect_handler};
use shortlink_ttl::api::routes::api_routes;
use shortlink_ttl::application::services::CreateLink;
use shortlink_ttl::config::Config;
use shortlink_ttl::domain::entities::{Link, NewLink};
use shortlink_ttl::domain::time::{ManualClock, TimeSource};
use shortlink_ttl::infrastructure::Store;
use shortlink_ttl::state::AppState;
use std::sync::Arc;

pub const BASE_URL: &str = "http://localhost:8080";
pub const CODE_SEED: u64 = 42;

/// Services over an in-memory store, driven by a manual clock.
pub struct TestApp {
    pub state: AppState,
    pub store: Store,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}

pub fn test_config() -> Config {
    Config {
        base_url: BASE_URL.to_string(),
        code_generator_seed: Some(CODE_SEED),
        sweep_retry_attempts: 0,
        ..Config::default()
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(test_config())
}

pub fn create_test_app_with(config: Config) -> TestApp {
    create_test_app_over(Store::in_memory(), config)
}

/// Services over a caller-built store, for wrapping a backend.
pub fn create_test_app_over(store: Store, config: Config) -> TestApp {
    let clock = Arc::new(ManualClock::new(
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc),
    ));
    let state = AppState::new(store.clone(), &config, clock.clone());

    TestApp {
        state,
        store,
        clock,
    }
}

/// The public routes without path normalisation or tracing.
pub fn make_server(app: &TestApp) -> TestServer {
    let router = Router::new()
        .route("/{code}", get(redirect_handler))
        .route("/health", get(health_handler))
        .nest("/api", api_routes())
        .with_state(app.state.clone());

    TestServer::new(router).unwrap()
}

/// Creates a link through the service with an alias and a lifetime.
pub async fn create_test_link(app: &TestApp, alias: &str, url: &str, lifetime: Duration) -> Link {
    app.state
        .link_service
        .create_link(
            CreateLink::new(url)
                .with_alias(alias)
                .expiring_at(app.now() + lifetime),
        )
        .await
        .unwrap()
}

/// Inserts a record straight into the store, bypassing the service.
pub async fn insert_raw_link(app: &TestApp, code: &str, expires_at: DateTime<Utc>) -> Link {
    app.store
        .links
        .create(NewLink {
            code: code.to_string(),
            target_url: format!("https://example.com/{}", code),
            created_at: app.now() - Duration::days(1),
            expires_at,
            domain_prefix: BASE_URL.to_string(),
        })
        .await
        .unwrap()
}
