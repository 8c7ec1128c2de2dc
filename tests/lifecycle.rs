mod common;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use shortlink_ttl::application::services::{CreateLink, Resolution};
use shortlink_ttl::domain::entities::{DeletionEntry, Link, NewLink};
use shortlink_ttl::domain::repositories::{DeletionLogRepository, LinkRepository};
use shortlink_ttl::error::AppError;
use shortlink_ttl::infrastructure::Store;
use shortlink_ttl::utils::code_generator::{CODE_LENGTH, CodeGenerator};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// ─── ABSENT CODES ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_absent_code_is_gone_with_no_time_left() {
    let app = common::create_test_app();

    for code in ["nope00", "missing", "x"] {
        let resolution = app.state.link_service.resolve_link(code).await.unwrap();
        assert_eq!(resolution, Resolution::Missing);
        assert!(resolution.is_gone());

        let remaining = app.state.link_service.remaining_lifetime(code).await.unwrap();
        assert!(remaining.is_zero());
    }

    assert_eq!(app.store.deletion_log.count().await.unwrap(), 0);
}

// ─── CREATION ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_applies_defaults() {
    let app = common::create_test_app();
    let now = app.now();

    let link = app
        .state
        .link_service
        .create_link(CreateLink::new("https://example.com"))
        .await
        .unwrap();

    assert_eq!(link.code.len(), CODE_LENGTH);
    assert!(link.code.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(link.created_at, now);
    assert_eq!(link.expires_at, now + Duration::days(7));
    assert_eq!(link.click_count, 0);
    assert_eq!(link.domain_prefix, common::BASE_URL);
    assert_eq!(link.short_url(), format!("{}/{}", common::BASE_URL, link.code));
}

#[tokio::test]
async fn test_create_keeps_explicit_domain_and_deadline() {
    let app = common::create_test_app();
    let deadline = app.now() + Duration::hours(2);

    let link = app
        .state
        .link_service
        .create_link(
            CreateLink::new("https://example.com")
                .with_domain_prefix("https://sho.rt")
                .expiring_at(deadline),
        )
        .await
        .unwrap();

    assert_eq!(link.domain_prefix, "https://sho.rt");
    assert_eq!(link.expires_at, deadline);
}

#[tokio::test]
async fn test_empty_alias_generates_code() {
    let app = common::create_test_app();

    let link = app
        .state
        .link_service
        .create_link(CreateLink::new("https://example.com").with_alias(""))
        .await
        .unwrap();

    assert_eq!(link.code.len(), CODE_LENGTH);
}

#[tokio::test]
async fn test_generated_codes_follow_seed() {
    let app = common::create_test_app();
    let expected = CodeGenerator::seeded(common::CODE_SEED);

    for _ in 0..3 {
        let link = app
            .state
            .link_service
            .create_link(CreateLink::new("https://example.com"))
            .await
            .unwrap();

        assert_eq!(link.code, expected.generate());
    }
}

#[tokio::test]
async fn test_generated_code_skips_live_collision() {
    let app = common::create_test_app();
    let predicted = CodeGenerator::seeded(common::CODE_SEED);
    let first = predicted.generate();
    let second = predicted.generate();

    common::insert_raw_link(&app, &first, app.now() + Duration::days(1)).await;

    let link = app
        .state
        .link_service
        .create_link(CreateLink::new("https://example.com/new"))
        .await
        .unwrap();

    assert_eq!(link.code, second);

    let untouched = app.store.links.find_by_code(&first).await.unwrap().unwrap();
    assert_eq!(untouched.target_url, format!("https://example.com/{}", first));
}

#[tokio::test]
async fn test_generated_code_skips_expired_record_awaiting_eviction() {
    let app = common::create_test_app();
    let predicted = CodeGenerator::seeded(common::CODE_SEED);
    let first = predicted.generate();
    let second = predicted.generate();

    common::insert_raw_link(&app, &first, app.now() - Duration::hours(1)).await;

    let link = app
        .state
        .link_service
        .create_link(CreateLink::new("https://example.com/new"))
        .await
        .unwrap();

    assert_eq!(link.code, second);
}

#[tokio::test]
async fn test_generated_code_gives_up_after_max_attempts() {
    let config = shortlink_ttl::config::Config {
        code_max_attempts: 3,
        ..common::test_config()
    };
    let app = common::create_test_app_with(config);

    let predicted = CodeGenerator::seeded(common::CODE_SEED);
    for _ in 0..3 {
        let code = predicted.generate();
        common::insert_raw_link(&app, &code, app.now() + Duration::days(1)).await;
    }

    let result = app
        .state
        .link_service
        .create_link(CreateLink::new("https://example.com"))
        .await;

    match result {
        Err(AppError::Conflict { message, .. }) => {
            assert_eq!(message, "Failed to generate unique code")
        }
        other => panic!("expected conflict, got {:?}", other),
    }
    assert_eq!(app.store.links.count().await.unwrap(), 3);
}

// ─── ALIASES ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_alias_uniqueness_while_live() {
    let app = common::create_test_app();

    common::create_test_link(&app, "promo1", "https://first.example.com", Duration::days(1)).await;

    let result = app
        .state
        .link_service
        .create_link(CreateLink::new("https://second.example.com").with_alias("promo1"))
        .await;

    assert!(matches!(result, Err(AppError::Conflict { .. })));

    let stored = app.store.links.find_by_code("promo1").await.unwrap().unwrap();
    assert_eq!(stored.target_url, "https://first.example.com");
    assert_eq!(app.store.links.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_expired_alias_can_be_reused() {
    let app = common::create_test_app();

    common::create_test_link(&app, "promo1", "https://first.example.com", Duration::hours(1)).await;
    app.advance(Duration::hours(2));

    let link = app
        .state
        .link_service
        .create_link(CreateLink::new("https://second.example.com").with_alias("promo1"))
        .await
        .unwrap();

    assert_eq!(link.target_url, "https://second.example.com");

    let entries = app.store.deletion_log.list_recent(None, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].code, "promo1");
    assert_eq!(entries[0].target_url, "https://first.example.com");
}

#[tokio::test]
async fn test_invalid_and_reserved_aliases_rejected() {
    let app = common::create_test_app();

    for alias in ["has space", "slash/y", "health", "api"] {
        let result = app
            .state
            .link_service
            .create_link(CreateLink::new("https://example.com").with_alias(alias))
            .await;

        assert!(
            matches!(result, Err(AppError::Validation { .. })),
            "alias '{}' should be rejected",
            alias
        );
    }

    assert_eq!(app.store.links.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_alias_creation_has_one_winner() {
    let app = common::create_test_app();
    let service = app.state.link_service.clone();

    let attempts = (0..8).map(|i| {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .create_link(
                    CreateLink::new(format!("https://example.com/{}", i)).with_alias("race01"),
                )
                .await
        })
    });

    let mut created = 0;
    let mut conflicts = 0;
    for handle in attempts.collect::<Vec<_>>() {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::Conflict { .. }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(app.store.links.count().await.unwrap(), 1);
}

// ─── EXPIRATION ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_expired_link_is_never_live() {
    let app = common::create_test_app();

    common::create_test_link(&app, "short1", "https://example.com", Duration::minutes(10)).await;

    app.advance(Duration::minutes(10));

    let resolution = app.state.link_service.resolve_link("short1").await.unwrap();
    assert_eq!(resolution, Resolution::Expired);

    // Evicted by the lookup; a second lookup sees nothing.
    let resolution = app.state.link_service.resolve_link("short1").await.unwrap();
    assert_eq!(resolution, Resolution::Missing);

    assert_eq!(app.store.deletion_log.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_remaining_lifetime_counts_down() {
    let app = common::create_test_app();

    common::create_test_link(&app, "timer1", "https://example.com", Duration::minutes(30)).await;

    let remaining = app.state.link_service.remaining_lifetime("timer1").await.unwrap();
    assert_eq!(remaining.as_secs(), 30 * 60);

    app.advance(Duration::minutes(20));
    let remaining = app.state.link_service.remaining_lifetime("timer1").await.unwrap();
    assert_eq!(remaining.as_secs(), 10 * 60);

    app.advance(Duration::minutes(15));
    let remaining = app.state.link_service.remaining_lifetime("timer1").await.unwrap();
    assert!(remaining.is_zero());

    // Remaining time never evicts.
    assert!(app.store.links.find_by_code("timer1").await.unwrap().is_some());
}

// ─── CLICKS ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_clicks_are_counted_while_live() {
    let app = common::create_test_app();

    common::create_test_link(&app, "click1", "https://example.com", Duration::days(1)).await;

    for expected in 1..=3 {
        let Resolution::Live(link) = app.state.link_service.resolve_link("click1").await.unwrap()
        else {
            panic!("link should be live");
        };
        let count = app.state.link_service.record_click(&link).await.unwrap();
        assert_eq!(count, Some(expected));
    }

    let stored = app.store.links.find_by_code("click1").await.unwrap().unwrap();
    assert_eq!(stored.click_count, 3);
}

#[tokio::test]
async fn test_click_after_eviction_does_not_recreate() {
    let app = common::create_test_app();

    common::create_test_link(&app, "late01", "https://example.com", Duration::minutes(5)).await;

    let Resolution::Live(link) = app.state.link_service.resolve_link("late01").await.unwrap()
    else {
        panic!("link should be live");
    };

    // The sweeper evicts the link between the lookup and the click.
    app.advance(Duration::minutes(6));
    let report = app.state.sweeper.sweep().await.unwrap().unwrap();
    assert_eq!(report.evicted, 1);

    let count = app.state.link_service.record_click(&link).await.unwrap();

    assert_eq!(count, None);
    assert!(app.store.links.find_by_code("late01").await.unwrap().is_none());
    assert_eq!(app.store.deletion_log.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_click_after_deadline_is_dropped() {
    let app = common::create_test_app();

    let link =
        common::create_test_link(&app, "edge01", "https://example.com", Duration::minutes(5))
            .await;

    app.advance(Duration::minutes(5));

    assert_eq!(app.state.link_service.record_click(&link).await.unwrap(), None);

    let stored = app.store.links.find_by_code("edge01").await.unwrap().unwrap();
    assert_eq!(stored.click_count, 0);
}

// ─── SWEEPER ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sweep_evicts_only_expired() {
    let app = common::create_test_app();

    common::create_test_link(&app, "old001", "https://example.com/1", Duration::hours(1)).await;
    common::create_test_link(&app, "old002", "https://example.com/2", Duration::hours(2)).await;
    common::create_test_link(&app, "new001", "https://example.com/3", Duration::days(3)).await;

    app.advance(Duration::hours(2));

    let report = app.state.sweeper.sweep().await.unwrap().unwrap();

    assert_eq!(report.scanned, 2);
    assert_eq!(report.evicted, 2);
    assert_eq!(report.failed, 0);

    assert!(app.store.links.find_by_code("old001").await.unwrap().is_none());
    assert!(app.store.links.find_by_code("old002").await.unwrap().is_none());
    assert!(app.store.links.find_by_code("new001").await.unwrap().is_some());

    let mut codes: Vec<String> = app
        .store
        .deletion_log
        .list_recent(None, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.code)
        .collect();
    codes.sort();
    assert_eq!(codes, vec!["old001", "old002"]);

    // A second sweep finds nothing more to do.
    let report = app.state.sweeper.sweep().await.unwrap().unwrap();
    assert_eq!(report.scanned, 0);
    assert_eq!(app.store.deletion_log.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_audit_entry_copies_record() {
    let app = common::create_test_app();

    let link =
        common::create_test_link(&app, "audit1", "https://example.com/a", Duration::hours(1))
            .await;

    app.advance(Duration::hours(3));
    let swept_at = app.now();
    app.state.sweeper.sweep().await.unwrap();

    let entries = app
        .store
        .deletion_log
        .list_recent(Some("audit1".to_string()), 10)
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].target_url, "https://example.com/a");
    assert_eq!(entries[0].expired_at, link.expires_at);
    assert_eq!(entries[0].deleted_at, swept_at);
}

#[tokio::test]
async fn test_lazy_and_sweep_eviction_race_writes_one_entry() {
    for _ in 0..20 {
        let app = common::create_test_app();

        common::create_test_link(&app, "race01", "https://example.com", Duration::minutes(1))
            .await;
        app.advance(Duration::minutes(2));

        let service = app.state.link_service.clone();
        let sweeper = app.state.sweeper.clone();

        let lookup = tokio::spawn(async move { service.resolve_link("race01").await });
        let sweep = tokio::spawn(async move { sweeper.sweep().await });

        let resolution = lookup.await.unwrap().unwrap();
        sweep.await.unwrap().unwrap();

        assert!(resolution.is_gone());
        assert!(app.store.links.find_by_code("race01").await.unwrap().is_none());
        assert_eq!(app.store.deletion_log.count().await.unwrap(), 1);
    }
}

#[tokio::test]
async fn test_concurrent_lookups_write_one_entry() {
    let app = common::create_test_app();

    common::create_test_link(&app, "many01", "https://example.com", Duration::minutes(1)).await;
    app.advance(Duration::minutes(2));

    let lookups: Vec<_> = (0..10)
        .map(|_| {
            let service = app.state.link_service.clone();
            tokio::spawn(async move { service.resolve_link("many01").await })
        })
        .collect();

    for handle in lookups {
        assert!(handle.await.unwrap().unwrap().is_gone());
    }

    assert_eq!(app.store.deletion_log.count().await.unwrap(), 1);
}

/// Record store whose first evictions fail as unavailable without writing.
struct FlakyEvictions {
    inner: Arc<dyn LinkRepository>,
    failures_left: AtomicUsize,
}

#[async_trait]
impl LinkRepository for FlakyEvictions {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        self.inner.create(new_link).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        self.inner.find_by_code(code).await
    }

    async fn exists_live(&self, code: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        self.inner.exists_live(code, now).await
    }

    async fn increment_clicks(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, AppError> {
        self.inner.increment_clicks(code, now).await
    }

    async fn evict_expired(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DeletionEntry>, AppError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::unavailable("store timed out", json!({ "code": code })));
        }
        self.inner.evict_expired(code, now).await
    }

    async fn list_all(&self) -> Result<Vec<Link>, AppError> {
        self.inner.list_all().await
    }

    async fn count(&self) -> Result<i64, AppError> {
        self.inner.count().await
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }
}

fn flaky_app(failures: usize, retry_attempts: usize) -> common::TestApp {
    let memory = Store::in_memory();
    let store = Store {
        links: Arc::new(FlakyEvictions {
            inner: memory.links,
            failures_left: AtomicUsize::new(failures),
        }),
        deletion_log: memory.deletion_log,
    };
    let config = shortlink_ttl::config::Config {
        sweep_retry_attempts: retry_attempts,
        ..common::test_config()
    };

    common::create_test_app_over(store, config)
}

#[tokio::test]
async fn test_sweep_retry_after_transient_failure_writes_one_entry() {
    let app = flaky_app(1, 3);

    common::create_test_link(&app, "abc123", "https://example.com", Duration::hours(1)).await;
    app.advance(Duration::hours(2));

    let report = app.state.sweeper.sweep().await.unwrap().unwrap();

    assert_eq!(report.scanned, 1);
    assert_eq!(report.evicted, 1);
    assert_eq!(report.already_gone, 0);
    assert_eq!(report.failed, 0);
    assert!(app.store.links.find_by_code("abc123").await.unwrap().is_none());

    let entries = app.store.deletion_log.list_recent(None, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].code, "abc123");
}

#[tokio::test]
async fn test_failed_eviction_leaves_record_for_next_sweep() {
    let app = flaky_app(1, 0);

    common::create_test_link(&app, "abc123", "https://example.com", Duration::hours(1)).await;
    app.advance(Duration::hours(2));

    let report = app.state.sweeper.sweep().await.unwrap().unwrap();
    assert_eq!(report.failed, 1);
    assert!(app.store.links.find_by_code("abc123").await.unwrap().is_some());
    assert_eq!(app.store.deletion_log.count().await.unwrap(), 0);

    let report = app.state.sweeper.sweep().await.unwrap().unwrap();
    assert_eq!(report.evicted, 1);
    assert!(app.store.links.find_by_code("abc123").await.unwrap().is_none());
    assert_eq!(app.store.deletion_log.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_failed_lazy_eviction_is_gone_and_swept_later() {
    let app = flaky_app(1, 0);

    common::create_test_link(&app, "abc123", "https://example.com", Duration::hours(1)).await;
    app.advance(Duration::hours(2));

    let resolution = app.state.link_service.resolve_link("abc123").await.unwrap();
    assert_eq!(resolution, Resolution::Expired);
    assert_eq!(app.store.deletion_log.count().await.unwrap(), 0);

    app.state.sweeper.sweep().await.unwrap();

    assert!(app.store.links.find_by_code("abc123").await.unwrap().is_none());
    assert_eq!(app.store.deletion_log.count().await.unwrap(), 1);
}

// ─── END TO END ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_lifecycle() {
    let app = common::create_test_app();

    let link = app
        .state
        .link_service
        .create_link(CreateLink::new("https://example.com").with_alias("abc123"))
        .await
        .unwrap();
    assert_eq!(link.code, "abc123");

    let Resolution::Live(live) = app.state.link_service.resolve_link("abc123").await.unwrap()
    else {
        panic!("link should be live");
    };
    assert_eq!(live.target_url, "https://example.com");
    assert_eq!(live.click_count, 0);

    let count = app.state.link_service.record_click(&live).await.unwrap();
    assert_eq!(count, Some(1));

    app.advance(Duration::days(7));

    let resolution = app.state.link_service.resolve_link("abc123").await.unwrap();
    assert!(resolution.is_gone());

    let entries = app
        .store
        .deletion_log
        .list_recent(Some("abc123".to_string()), 10)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].target_url, "https://example.com");
}
