//! Drives one test case through its result state machine.
//!
//! QUEUED → ASSIGNED → RUNNING → terminal, with a single requeue when the
//! platform reports missing capacity. Every status change is notified as a
//! `TestResult` message.

use std::future::Future;
use std::sync::Arc;

use crate::lifecycle::{EnvironmentManager, LifecycleError, SharedEnvironment};
use crate::messages::Message;
use crate::notifier::Notifier;
use crate::result::{classify_failure, ResultResult, TestResult, TestStatus};
use crate::schema::EnvironmentSpace;

pub struct CaseRunner {
    manager: Arc<EnvironmentManager>,
    notifier: Arc<dyn Notifier>,
}

impl CaseRunner {
    pub fn new(manager: Arc<EnvironmentManager>, notifier: Arc<dyn Notifier>) -> Self {
        Self { manager, notifier }
    }

    pub fn manager(&self) -> &Arc<EnvironmentManager> {
        &self.manager
    }

    /// Run `body` on an environment satisfying `requirement`.
    ///
    /// Environment problems end the result as SKIPPED or FAILED without
    /// calling `body`. Errors from `body` are classified with
    /// [`classify_failure`]; a FAILED case leaves its environment dirty.
    /// Only an invalid status transition is returned as an error.
    pub async fn run<F, Fut>(
        &self,
        result: &mut TestResult,
        requirement: &EnvironmentSpace,
        body: F,
    ) -> ResultResult<()>
    where
        F: FnOnce(SharedEnvironment) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let Some(shared) = self.acquire(result, requirement).await? else {
            return Ok(());
        };

        let metadata = shared.lock().await.metadata();
        result.set_environment(metadata);
        self.transition(result, TestStatus::Running, "")?;

        let outcome = body(shared.clone()).await;
        let (status, message) = match outcome {
            Ok(()) => (TestStatus::Passed, String::new()),
            Err(err) => {
                let outcome = classify_failure(&format!("{err:#}"));
                (outcome.status(), outcome.message().to_string())
            }
        };
        if status == TestStatus::Failed {
            if let Err(err) = self.manager.mark_dirty(&shared).await {
                tracing::warn!(case = %result.name, error = %err, "cannot mark environment dirty");
            }
        }
        self.manager.release(&shared).await;
        self.transition(result, status, message)
    }

    /// Prepare, deploy and connect. `None` means the result is already final.
    async fn acquire(
        &self,
        result: &mut TestResult,
        requirement: &EnvironmentSpace,
    ) -> ResultResult<Option<SharedEnvironment>> {
        loop {
            let shared = match self.manager.prepare(requirement).await {
                Ok(shared) => shared,
                Err(err) => {
                    self.finish_with(result, &err)?;
                    return Ok(None);
                }
            };
            self.transition(result, TestStatus::Assigned, "")?;

            let provisioned = match self.manager.deploy(&shared).await {
                Ok(()) => self.manager.connect(&shared).await,
                Err(err) => Err(err),
            };
            let Err(err) = provisioned else {
                return Ok(Some(shared));
            };

            self.manager.delete(&shared).await;
            if err.is_capacity() && !result.is_requeued() {
                tracing::info!(case = %result.name, error = %err, "requeueing case");
                self.transition(result, TestStatus::Queued, err.to_string())?;
                continue;
            }
            self.finish_with(result, &err)?;
            return Ok(None);
        }
    }

    fn finish_with(&self, result: &mut TestResult, err: &LifecycleError) -> ResultResult<()> {
        let (status, message) = if err.is_skip() || matches!(err, LifecycleError::Cancelled { .. }) {
            (TestStatus::Skipped, err.to_string())
        } else {
            let outcome = classify_failure(&err.to_string());
            (outcome.status(), outcome.message().to_string())
        };
        // a queued result can only be skipped directly
        if result.status() == TestStatus::Queued && status != TestStatus::Skipped {
            self.transition(result, TestStatus::Assigned, "")?;
        }
        self.transition(result, status, message)
    }

    fn transition(
        &self,
        result: &mut TestResult,
        status: TestStatus,
        message: impl Into<String>,
    ) -> ResultResult<()> {
        result.set_status(status, message)?;
        self.notifier.notify(&Message::TestResult(result.to_message()));
        Ok(())
    }
}

impl std::fmt::Debug for CaseRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseRunner")
            .field("manager", &self.manager)
            .finish()
    }
}
