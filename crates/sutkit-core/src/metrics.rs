//! Process-wide counters for environments the lifecycle manager handles.
//!
//! The manager bumps these as it goes; [`Metrics::flush`] reports them all in
//! one `info!` event, typically once a run has shut its manager down.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Relaxed atomics; values are for reporting, not synchronization.
pub struct Metrics {
    environments_prepared: AtomicU64,
    environments_reused: AtomicU64,
    environments_deployed: AtomicU64,
    environments_deleted: AtomicU64,
    deployment_failures: AtomicU64,
    delete_failures: AtomicU64,
    connection_retries: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            environments_prepared: AtomicU64::new(0),
            environments_reused: AtomicU64::new(0),
            environments_deployed: AtomicU64::new(0),
            environments_deleted: AtomicU64::new(0),
            deployment_failures: AtomicU64::new(0),
            delete_failures: AtomicU64::new(0),
            connection_retries: AtomicU64::new(0),
        }
    }

    pub fn inc_prepared(&self) {
        self.environments_prepared.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "environments_prepared", "counter incremented");
    }

    pub fn inc_reused(&self) {
        self.environments_reused.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "environments_reused", "counter incremented");
    }

    pub fn inc_deployed(&self) {
        self.environments_deployed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "environments_deployed", "counter incremented");
    }

    pub fn inc_deleted(&self) {
        self.environments_deleted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "environments_deleted", "counter incremented");
    }

    pub fn inc_deployment_failures(&self) {
        self.deployment_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "deployment_failures", "counter incremented");
    }

    pub fn inc_delete_failures(&self) {
        self.delete_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "delete_failures", "counter incremented");
    }

    pub fn inc_connection_retries(&self) {
        self.connection_retries.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "connection_retries", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a run, shutdown) rather than
    /// on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            environments_prepared = self.environments_prepared(),
            environments_reused = self.environments_reused(),
            environments_deployed = self.environments_deployed(),
            environments_deleted = self.environments_deleted(),
            deployment_failures = self.deployment_failures(),
            delete_failures = self.delete_failures(),
            connection_retries = self.connection_retries(),
        );
    }

    pub fn environments_prepared(&self) -> u64 {
        self.environments_prepared.load(Ordering::Relaxed)
    }

    pub fn environments_reused(&self) -> u64 {
        self.environments_reused.load(Ordering::Relaxed)
    }

    pub fn environments_deployed(&self) -> u64 {
        self.environments_deployed.load(Ordering::Relaxed)
    }

    pub fn environments_deleted(&self) -> u64 {
        self.environments_deleted.load(Ordering::Relaxed)
    }

    pub fn deployment_failures(&self) -> u64 {
        self.deployment_failures.load(Ordering::Relaxed)
    }

    pub fn delete_failures(&self) -> u64 {
        self.delete_failures.load(Ordering::Relaxed)
    }

    pub fn connection_retries(&self) -> u64 {
        self.connection_retries.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.environments_prepared.store(0, Ordering::Relaxed);
        self.environments_reused.store(0, Ordering::Relaxed);
        self.environments_deployed.store(0, Ordering::Relaxed);
        self.environments_deleted.store(0, Ordering::Relaxed);
        self.deployment_failures.store(0, Ordering::Relaxed);
        self.delete_failures.store(0, Ordering::Relaxed);
        self.connection_retries.store(0, Ordering::Relaxed);
    }
}
