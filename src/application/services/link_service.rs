//! Link lifecycle service: creation, resolution, click accounting and
//! remaining-lifetime queries. Owns the expiration policy.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::application::services::eviction_service::{EvictionCause, EvictionService};
use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::domain::time::TimeSource;
use crate::error::AppError;
use crate::utils::code_generator::{CodeGenerator, validate_custom_code};

/// Default lifetime, in seconds, of a link created without an explicit deadline.
pub const DEFAULT_LINK_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Creation defaults applied by [`LinkService::create_link`].
#[derive(Debug, Clone)]
pub struct LinkPolicy {
    /// Lifetime used when the caller gives no `expires_at`.
    pub default_ttl: chrono::Duration,
    /// Prefix used when the caller gives no custom domain.
    pub default_domain_prefix: String,
    /// How many generated codes to try before giving up.
    pub max_code_attempts: usize,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            default_ttl: chrono::Duration::seconds(DEFAULT_LINK_TTL_SECS),
            default_domain_prefix: "http://localhost:8080".to_string(),
            max_code_attempts: 10,
        }
    }
}

/// A shorten request after transport decoding.
#[derive(Debug, Clone, Default)]
pub struct CreateLink {
    pub target_url: String,
    pub custom_alias: Option<String>,
    pub domain_prefix: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateLink {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.custom_alias = Some(alias.into());
        self
    }

    pub fn with_domain_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.domain_prefix = Some(prefix.into());
        self
    }

    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Outcome of looking up a short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The record exists and its deadline has not passed.
    Live(Link),
    /// The record was past its deadline; it has been evicted.
    Expired,
    /// No record holds this code.
    Missing,
}

impl Resolution {
    pub fn is_gone(&self) -> bool {
        !matches!(self, Resolution::Live(_))
    }
}

/// Service orchestrating the short-link lifecycle.
///
/// A record is created here, mutated only by [`Self::record_click`], and
/// destroyed exactly once through the shared [`EvictionService`], either
/// lazily by [`Self::resolve_link`] or by the expiry sweeper.
pub struct LinkService<L: LinkRepository + ?Sized> {
    link_repository: Arc<L>,
    eviction: Arc<EvictionService<L>>,
    codes: CodeGenerator,
    clock: Arc<dyn TimeSource>,
    policy: LinkPolicy,
}

impl<L: LinkRepository + ?Sized> LinkService<L> {
    /// Creates a new link service.
    pub fn new(
        link_repository: Arc<L>,
        eviction: Arc<EvictionService<L>>,
        codes: CodeGenerator,
        clock: Arc<dyn TimeSource>,
        policy: LinkPolicy,
    ) -> Self {
        Self {
            link_repository,
            eviction,
            codes,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &LinkPolicy {
        &self.policy
    }

    /// Creates and stores a new short link.
    ///
    /// # Code Resolution
    ///
    /// - A non-empty `custom_alias` is validated and used verbatim. It is never
    ///   replaced by a generated code.
    /// - Otherwise a 6-character code is generated, retrying on collision up to
    ///   [`LinkPolicy::max_code_attempts`] times.
    ///
    /// # Defaults
    ///
    /// - Empty or missing `domain_prefix` becomes the configured base address
    /// - Missing `expires_at` becomes now + [`LinkPolicy::default_ttl`]
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the alias is malformed.
    ///
    /// Returns [`AppError::Conflict`] if the alias is held by a live record, or
    /// if no free generated code was found.
    pub async fn create_link(&self, request: CreateLink) -> Result<Link, AppError> {
        let now = self.clock.now();

        let domain_prefix = request
            .domain_prefix
            .map(|prefix| prefix.trim().to_string())
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or_else(|| self.policy.default_domain_prefix.clone());

        let expires_at = request
            .expires_at
            .unwrap_or(now + self.policy.default_ttl);

        let custom_alias = request.custom_alias.filter(|alias| !alias.is_empty());

        let link = match custom_alias {
            Some(alias) => {
                validate_custom_code(&alias)?;
                self.reserve_alias(&alias, now).await?;

                let new_link = NewLink {
                    code: alias.clone(),
                    target_url: request.target_url,
                    created_at: now,
                    expires_at,
                    domain_prefix,
                };

                self.link_repository
                    .create(new_link)
                    .await
                    .map_err(|e| match e {
                        AppError::Conflict { .. } => alias_conflict(&alias),
                        other => other,
                    })?
            }
            None => {
                self.create_with_generated_code(request.target_url, now, expires_at, domain_prefix)
                    .await?
            }
        };

        info!(code = %link.code, expires_at = %link.expires_at, "Short link created");
        metrics::counter!("links_created_total").increment(1);

        Ok(link)
    }

    /// Looks up a code, evicting it if its deadline has passed.
    ///
    /// An expired record is never returned as live. If the eviction itself
    /// fails, the failure is logged and the result is still
    /// [`Resolution::Expired`]; the sweeper retries the eviction later.
    ///
    /// # Errors
    ///
    /// Returns store errors from the initial read.
    pub async fn resolve_link(&self, code: &str) -> Result<Resolution, AppError> {
        let Some(link) = self.link_repository.find_by_code(code).await? else {
            return Ok(Resolution::Missing);
        };

        let now = self.clock.now();

        if link.is_expired_at(now) {
            if let Err(e) = self.eviction.evict(&link, now, EvictionCause::Lookup).await {
                warn!(code = %link.code, "Lazy eviction failed, leaving it to the sweeper: {}", e);
            }
            return Ok(Resolution::Expired);
        }

        Ok(Resolution::Live(link))
    }

    /// Counts one visit on a link just resolved as live.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(count))` with the new click count
    /// - `Ok(None)` if the link was evicted or expired in the meantime; the
    ///   click is dropped and the record is not recreated
    pub async fn record_click(&self, link: &Link) -> Result<Option<i64>, AppError> {
        let now = self.clock.now();
        let count = self
            .link_repository
            .increment_clicks(&link.code, now)
            .await?;

        if count.is_none() {
            debug!(code = %link.code, "Click dropped, link no longer live");
        }

        Ok(count)
    }

    /// Time left before the code expires, clamped to zero.
    ///
    /// Returns zero for unknown codes; expired and never-existing codes are not
    /// distinguished here. Does not evict.
    pub async fn remaining_lifetime(&self, code: &str) -> Result<Duration, AppError> {
        let now = self.clock.now();

        Ok(self
            .link_repository
            .find_by_code(code)
            .await?
            .map(|link| link.remaining_at(now))
            .unwrap_or(Duration::ZERO))
    }

    /// Checks whether a custom alias can be taken.
    ///
    /// A record still holding the alias after its deadline is evicted here, so an
    /// expired alias can be reused immediately instead of after the next sweep.
    async fn reserve_alias(&self, alias: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        match self.link_repository.find_by_code(alias).await? {
            Some(existing) if !existing.is_expired_at(now) => Err(alias_conflict(alias)),
            Some(stale) => {
                self.eviction
                    .evict(&stale, now, EvictionCause::Create)
                    .await?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Generates codes until one is inserted.
    ///
    /// A collision at insert time (a concurrent creation or an expired record
    /// awaiting eviction) counts as an attempt.
    async fn create_with_generated_code(
        &self,
        target_url: String,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        domain_prefix: String,
    ) -> Result<Link, AppError> {
        for attempt in 1..=self.policy.max_code_attempts {
            let code = self.codes.generate();

            if self.link_repository.exists_live(&code, now).await? {
                debug!(%code, attempt, "Generated code collides with a live link");
                continue;
            }

            let new_link = NewLink {
                code: code.clone(),
                target_url: target_url.clone(),
                created_at: now,
                expires_at,
                domain_prefix: domain_prefix.clone(),
            };

            match self.link_repository.create(new_link).await {
                Ok(link) => return Ok(link),
                Err(AppError::Conflict { .. }) => {
                    debug!(%code, attempt, "Generated code taken at insert");
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            attempts = self.policy.max_code_attempts,
            "Failed to generate a unique short code"
        );

        Err(AppError::conflict(
            "Failed to generate unique code",
            json!({ "reason": "Too many collisions", "attempts": self.policy.max_code_attempts }),
        ))
    }
}

fn alias_conflict(alias: &str) -> AppError {
    AppError::conflict("Custom alias already taken", json!({ "code": alias }))
}
