//! Structured observability hooks for environment and result lifecycle events.
//!
//! This module provides:
//! - Environment-scoped tracing spans, either entered through the
//!   `EnvironmentSpan` RAII guard or attached to a future with `Instrument`
//! - Emission functions for lifecycle milestones: prepared, deployed, connected, deleted
//!
//! Events are emitted at `info!` level (delete failures at `warn!`). Use
//! `RUST_LOG` to filter and `--json` on the CLI for JSON lines.

use tracing::{info, warn};

use crate::environment::EnvironmentStatus;
use crate::result::TestStatus;

/// Span tagged with the environment's id and name.
///
/// Async callers attach it with `tracing::Instrument` since an entered span
/// must not be held across an `.await`.
pub fn environment_span(environment_id: &str, environment_name: &str) -> tracing::Span {
    tracing::info_span!(
        "sutkit.environment",
        environment_id = %environment_id,
        environment_name = %environment_name,
    )
}

/// RAII guard that enters an environment-scoped span for synchronous code.
///
/// ```ignore
/// let _span = EnvironmentSpan::enter(&env.id.to_string(), &env.name);
/// // events below carry environment_id and environment_name
/// ```
pub struct EnvironmentSpan {
    _span: tracing::span::EnteredSpan,
}

impl EnvironmentSpan {
    pub fn enter(environment_id: &str, environment_name: &str) -> Self {
        Self {
            _span: environment_span(environment_id, environment_name).entered(),
        }
    }
}

/// Emit event: a requirement was resolved into a new or reused environment.
pub fn emit_environment_prepared(environment_id: &str, candidate: &str, reused: bool) {
    info!(
        event = "environment.prepared",
        environment_id = %environment_id,
        candidate = %candidate,
        reused = reused,
    );
}

pub fn emit_environment_deployed(environment_id: &str, platform: &str, nodes: usize) {
    info!(
        event = "environment.deployed",
        environment_id = %environment_id,
        platform = %platform,
        nodes = nodes,
    );
}

/// Emit event: every node has an open session.
pub fn emit_environment_connected(environment_id: &str, nodes: usize, attempts: u32) {
    info!(
        event = "environment.connected",
        environment_id = %environment_id,
        nodes = nodes,
        attempts = attempts,
    );
}

pub fn emit_environment_deleted(environment_id: &str, from: EnvironmentStatus, dirty: bool) {
    info!(
        event = "environment.deleted",
        environment_id = %environment_id,
        from = %from,
        dirty = dirty,
    );
}

/// Emit event: platform delete failed (warning level). The environment is
/// still considered deleted.
pub fn emit_environment_delete_failed(environment_id: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "environment.delete_failed",
        environment_id = %environment_id,
        error = %error,
    );
}

pub fn emit_result_status_changed(result_id: &str, name: &str, from: TestStatus, to: TestStatus) {
    info!(
        event = "result.status_changed",
        result_id = %result_id,
        name = %name,
        from = %from,
        to = %to,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_span_create() {
        let _span = EnvironmentSpan::enter("env-1", "pool-a");
    }
}
