//! Periodic retention sweeps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{retention_days, ArtifactStore, BlobKind};
use crate::config::StorageConfig;
use crate::metrics::{RETENTION_DELETED, RETENTION_SWEEPS};

/// What to sweep and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Artifact horizon; `None` skips artifacts.
    pub artifacts: Option<Duration>,
    /// Original horizon; `None` skips originals.
    pub originals: Option<Duration>,
    pub interval: Duration,
}

impl RetentionPolicy {
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            artifacts: config
                .artifacts_enabled
                .then(|| retention_days(config.artifacts_retention_days)),
            // Originals stored before `originals_enabled` was turned off
            // still expire.
            originals: Some(retention_days(config.originals_retention_days)),
            interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
        }
    }

    fn targets(&self) -> impl Iterator<Item = (BlobKind, Duration)> + '_ {
        [
            (BlobKind::Artifact, self.artifacts),
            (BlobKind::Original, self.originals),
        ]
        .into_iter()
        .filter_map(|(kind, horizon)| horizon.map(|h| (kind, h)))
    }
}

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub artifacts_deleted: usize,
    pub originals_deleted: usize,
    /// Kinds whose sweep failed outright.
    pub failures: usize,
}

/// Background task deleting blobs past their retention horizon.
///
/// Sweeps once on start, then every `interval`, until stopped.
pub struct RetentionSweeper {
    store: Arc<dyn ArtifactStore>,
    policy: RetentionPolicy,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn ArtifactStore>, policy: RetentionPolicy) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            store,
            policy,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Run a single pass. Failures are logged and counted, never returned.
    pub async fn run_once(&self) -> SweepReport {
        Self::sweep_all(self.store.as_ref(), &self.policy).await
    }

    async fn sweep_all(store: &dyn ArtifactStore, policy: &RetentionPolicy) -> SweepReport {
        let mut report = SweepReport::default();

        for (kind, horizon) in policy.targets() {
            match store.sweep(kind, horizon).await {
                Ok(deleted) => {
                    RETENTION_DELETED
                        .with_label_values(&[kind.as_str()])
                        .inc_by(deleted as u64);
                    match kind {
                        BlobKind::Artifact => report.artifacts_deleted = deleted,
                        BlobKind::Original => report.originals_deleted = deleted,
                    }
                }
                Err(e) => {
                    warn!(kind = %kind, backend = store.backend_name(), error = %e, "Retention sweep failed");
                    report.failures += 1;
                }
            }
        }

        let result = if report.failures == 0 { "success" } else { "failed" };
        RETENTION_SWEEPS.with_label_values(&[result]).inc();

        if report.artifacts_deleted + report.originals_deleted > 0 {
            info!(
                artifacts = report.artifacts_deleted,
                originals = report.originals_deleted,
                "Retention sweep removed expired blobs"
            );
        }

        report
    }

    /// Spawn the sweep loop.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Retention sweeper already running");
            return;
        }

        let store = Arc::clone(&self.store);
        let policy = self.policy.clone();
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!(interval_secs = policy.interval.as_secs(), "Retention sweeper started");
            Self::sweep_all(store.as_ref(), &policy).await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Retention sweeper received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(policy.interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        Self::sweep_all(store.as_ref(), &policy).await;
                    }
                }
            }
            info!("Retention sweeper stopped");
        });

        *self.handle.lock().unwrap() = Some(handle);
    }

    /// Signal the loop and wait for it to exit.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Retention sweeper not running");
            return;
        }

        let _ = self.shutdown_tx.send(());

        let handle = self.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Retention sweeper task ended abnormally");
            }
        }
    }
}
