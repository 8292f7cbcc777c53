//! Observability tests for environment lifecycle tracing.
//!
//! These tests check that lifecycle events and metric flushes can be emitted
//! under a capturing subscriber, and that the manager counts what it does.

use std::sync::Arc;

use sutkit_core::environment::EnvironmentStatus;
use sutkit_core::fakes::{FakeConnector, FakePlatform};
use sutkit_core::lifecycle::{EnvironmentManager, LifecycleConfig};
use sutkit_core::metrics::METRICS;
use sutkit_core::obs::{
    emit_environment_connected, emit_environment_delete_failed, emit_environment_deleted,
    emit_environment_deployed, emit_environment_prepared, emit_result_status_changed,
    EnvironmentSpan,
};
use sutkit_core::result::TestStatus;
use sutkit_core::schema::{EnvironmentSpace, NodeSpace};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_emit_environment_prepared() {
    emit_environment_prepared("env-1", "pool-a", false);
}

#[traced_test]
#[test]
fn test_emit_environment_deployed_and_connected() {
    emit_environment_deployed("env-2", "baremetal", 2);
    emit_environment_connected("env-2", 2, 3);
}

#[traced_test]
#[test]
fn test_emit_environment_deleted_from_connected() {
    emit_environment_deleted("env-3", EnvironmentStatus::Connected, true);
}

/// Delete failures are logged at warn level and never panic.
#[traced_test]
#[test]
fn test_emit_environment_delete_failed() {
    let error = "rack manager unreachable";
    emit_environment_delete_failed("env-4", &error);
}

#[traced_test]
#[test]
fn test_emit_result_status_changed() {
    emit_result_status_changed("result-1", "smoke", TestStatus::Running, TestStatus::Passed);
}

#[traced_test]
#[test]
fn test_environment_span_nests_events() {
    let _span = EnvironmentSpan::enter("env-5", "pool-b");
    emit_environment_prepared("env-5", "pool-b", true);
    tracing::info!("inside environment span");
    assert!(logs_contain("inside environment span"));
}

#[traced_test]
#[test]
fn test_metrics_flush_emits() {
    METRICS.flush();
}

/// Counters are global and tests run in parallel, so only lower bounds hold.
#[tokio::test]
#[traced_test]
async fn test_manager_updates_counters() {
    let before_prepared = METRICS.environments_prepared();
    let before_deleted = METRICS.environments_deleted();

    let manager = EnvironmentManager::new(
        Arc::new(FakePlatform::new()),
        Arc::new(FakeConnector::new()),
        vec![EnvironmentSpace::named("pool").with_node(NodeSpace::default())],
        LifecycleConfig::default(),
    );
    let env = manager.prepare(&EnvironmentSpace::default()).await.unwrap();
    manager.deploy(&env).await.unwrap();
    manager.shutdown().await;

    assert!(METRICS.environments_prepared() > before_prepared);
    assert!(METRICS.environments_deleted() > before_deleted);
}
