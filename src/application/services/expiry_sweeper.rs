//! Periodic sweep that evicts every expired record.
//!
//! The sweep is the second enforcement path next to lazy eviction on lookup.
//! Both go through [`EvictionService`], so a record evicted by one path is
//! simply skipped by the other.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, warn};

use crate::application::services::eviction_service::{EvictionCause, EvictionService};
use crate::domain::repositories::LinkRepository;
use crate::domain::time::TimeSource;
use crate::error::AppError;

/// Summary of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Expired records found by the scan.
    pub scanned: usize,
    /// Records this sweep removed (one audit entry each).
    pub evicted: usize,
    /// Records another path removed first.
    pub already_gone: usize,
    /// Records left in place because of errors; retried on the next run.
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Scans the record store and evicts expired records.
pub struct ExpirySweeper<L: LinkRepository + ?Sized> {
    link_repository: Arc<L>,
    eviction: Arc<EvictionService<L>>,
    clock: Arc<dyn TimeSource>,
    retry_attempts: usize,
    running: Mutex<()>,
    last_report: RwLock<Option<SweepReport>>,
}

impl<L: LinkRepository + ?Sized> ExpirySweeper<L> {
    /// Creates a new sweeper.
    ///
    /// `retry_attempts` bounds the retries of a transient failure on one record
    /// within a single sweep.
    pub fn new(
        link_repository: Arc<L>,
        eviction: Arc<EvictionService<L>>,
        clock: Arc<dyn TimeSource>,
        retry_attempts: usize,
    ) -> Self {
        Self {
            link_repository,
            eviction,
            clock,
            retry_attempts,
            running: Mutex::new(()),
            last_report: RwLock::new(None),
        }
    }

    /// Runs one sweep.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(report))` when the sweep ran
    /// - `Ok(None)` when another sweep is still in progress
    ///
    /// A failure on one record is logged and counted in
    /// [`SweepReport::failed`]; the remaining records are still processed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot be scanned at all.
    pub async fn sweep(&self) -> Result<Option<SweepReport>, AppError> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("Sweep already in progress, skipping");
            return Ok(None);
        };

        let started_at = self.clock.now();
        let expired = self.link_repository.list_expired(started_at).await?;

        let mut report = SweepReport {
            scanned: expired.len(),
            evicted: 0,
            already_gone: 0,
            failed: 0,
            started_at,
            finished_at: started_at,
        };

        for link in &expired {
            let strategy = ExponentialBackoff::from_millis(50)
                .max_delay(Duration::from_secs(2))
                .map(jitter)
                .take(self.retry_attempts);

            let outcome = RetryIf::start(
                strategy,
                || self.eviction.evict(link, started_at, EvictionCause::Sweep),
                |e: &AppError| e.is_transient(),
            )
            .await;

            match outcome {
                Ok(Some(_)) => report.evicted += 1,
                Ok(None) => report.already_gone += 1,
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("sweep_failures_total").increment(1);
                    warn!(code = %link.code, "Failed to evict expired link, skipping: {}", e);
                }
            }
        }

        report.finished_at = self.clock.now();

        if report.scanned > 0 {
            info!(
                scanned = report.scanned,
                evicted = report.evicted,
                already_gone = report.already_gone,
                failed = report.failed,
                "Expiry sweep finished"
            );
        } else {
            debug!("Expiry sweep found nothing to evict");
        }

        *self
            .last_report
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(report.clone());

        Ok(Some(report))
    }

    /// Report of the most recent completed sweep.
    pub fn last_report(&self) -> Option<SweepReport> {
        self.last_report
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Runs the sweeper on a fixed period until `shutdown` fires.
///
/// The first sweep runs immediately. Sweeps never overlap: the next tick is
/// only awaited once the current sweep has finished, and ticks missed during a
/// slow sweep are delayed rather than bunched up.
pub async fn run_expiry_sweeper<L>(
    sweeper: Arc<ExpirySweeper<L>>,
    period: Duration,
    mut shutdown: oneshot::Receiver<()>,
) where
    L: LinkRepository + ?Sized,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Expiry sweeper started (interval={:?})", period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = sweeper.sweep().await {
                    error!("Expiry sweep aborted: {}", e);
                }
            }
            _ = &mut shutdown => {
                info!("Expiry sweeper stopping");
                break;
            }
        }
    }
}
