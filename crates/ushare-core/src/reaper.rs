// ============================================================================
// UShare Core - Reaper
// File: crates/ushare-core/src/reaper.rs
// Description: Second phase of group deletion (inactive -> erased)
// ============================================================================
//! Reaper
//!
//! Finds inactive groups, removes their blob directories, then hard-deletes
//! their rows. Filesystem first: a crash in between leaves an inactive row
//! whose directory is already gone, and the next tick finishes the job.
//!
//! Mutual exclusion is in-process only. Running several instances against one
//! database needs a distributed lock, which this does not provide.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::domain::GroupState;
use crate::error::DomainError;
use crate::repositories::{BlobArea, MembershipStore};

/// What happened to the inactive groups seen by one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReapReport {
    pub discovered: Vec<String>,
    pub erased: Vec<String>,
    /// Directory removal failed; the row is kept for the next tick.
    pub failed: Vec<String>,
}

impl ReapReport {
    /// Some inactive group could not be fully processed this tick.
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

#[derive(Debug)]
pub enum ReapOutcome {
    /// Another tick was still running.
    Skipped,
    Reaped(ReapReport),
    /// Scan or erase transaction failed; nothing was erased.
    Failed(DomainError),
}

pub struct Reaper {
    store: Arc<dyn MembershipStore>,
    blobs: Arc<dyn BlobArea>,
    running: AtomicBool,
}

/// Clears the running flag however the tick ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Reaper {
    pub fn new(store: Arc<dyn MembershipStore>, blobs: Arc<dyn BlobArea>) -> Self {
        Self {
            store,
            blobs,
            running: AtomicBool::new(false),
        }
    }

    /// One reaper tick. Returns immediately with `Skipped` while another tick runs.
    pub async fn run_once(&self) -> ReapOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Reaper tick skipped: previous tick still running");
            return ReapOutcome::Skipped;
        }
        let _guard = RunGuard(&self.running);

        // 1. Scan
        let discovered = match self.scan().await {
            Ok(names) => names,
            Err(e) => {
                error!("Reaper scan failed: {}", e);
                return ReapOutcome::Failed(e);
            }
        };

        if discovered.is_empty() {
            debug!("Reaper found no inactive groups");
            return ReapOutcome::Reaped(ReapReport::default());
        }
        info!("Reaper found {} inactive group(s)", discovered.len());

        // 2. Directories, concurrently
        let removals = join_all(discovered.iter().map(|name| async move {
            (name, self.blobs.remove_group_dir(name).await)
        }))
        .await;

        let mut removed = Vec::with_capacity(removals.len());
        let mut failed = Vec::new();
        for (name, result) in removals {
            match result {
                Ok(()) => removed.push(name.clone()),
                Err(e) => {
                    warn!("Reaper could not remove directory of [{}]: {}", name, e);
                    failed.push(name.clone());
                }
            }
        }

        // 3. Rows, for exactly the names whose directory is gone
        let erased = match self.erase(&removed).await {
            Ok(erased) => erased,
            Err(e) => {
                error!("Reaper erase transaction failed: {}", e);
                return ReapOutcome::Failed(e);
            }
        };

        let report = ReapReport {
            discovered,
            erased,
            failed,
        };

        if report.is_partial() {
            warn!(
                "Partial reap: erased {:?}, will retry {:?}",
                report.erased, report.failed
            );
        } else {
            info!("Reaper erased {:?}", report.erased);
        }

        ReapOutcome::Reaped(report)
    }

    async fn scan(&self) -> Result<Vec<String>, DomainError> {
        let mut tx = self.store.begin().await?;
        let groups = tx.list_groups(GroupState::Inactive).await?;
        tx.commit().await?;

        Ok(groups
            .into_iter()
            .filter(|g| g.state.erase(&g.name).is_ok())
            .map(|g| g.name)
            .collect())
    }

    async fn erase(&self, names: &[String]) -> Result<Vec<String>, DomainError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.store.begin().await?;
        let mut erased = Vec::with_capacity(names.len());
        for name in names {
            match tx.erase_group(name).await? {
                0 => warn!("Group [{}] was already erased", name),
                _ => erased.push(name.clone()),
            }
        }
        tx.commit().await?;

        Ok(erased)
    }

    /// Run `run_once` every `period` until `shutdown` flips to true.
    ///
    /// Each tick is its own task so a slow tick never delays the timer; the
    /// single-flight flag turns overlapping ticks into no-ops. On shutdown the
    /// loop waits for an in-progress tick to finish.
    pub fn spawn(
        self: Arc<Self>,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = period.as_secs(), "Reaper scheduler started");

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut ticks = JoinSet::new();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        while ticks.try_join_next().is_some() {}
                        let reaper = Arc::clone(&self);
                        ticks.spawn(async move {
                            if let ReapOutcome::Skipped = reaper.run_once().await {
                                info!("Reaper tick skipped, previous tick still running");
                            }
                        });
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            while ticks.join_next().await.is_some() {}
            info!("Reaper scheduler stopped");
        })
    }
}
