use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use uuid::Uuid;

use super::status::TestStatus;
use crate::messages::TestResultMessage;
use crate::obs;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResultError {
    #[error("test result {name}: invalid transition {from} -> {to}")]
    InvalidTransition {
        name: String,
        from: TestStatus,
        to: TestStatus,
    },
}

pub type ResultResult<T> = std::result::Result<T, ResultError>;

/// One test-case invocation.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub id: String,
    pub name: String,
    pub suite_name: String,
    pub message: String,
    pub stacktrace: Option<String>,
    pub information: BTreeMap<String, String>,
    status: TestStatus,
    requeued: bool,
    environment: Option<BTreeMap<String, String>>,
    started: Option<Instant>,
    elapsed: Option<Duration>,
}

impl TestResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            suite_name: String::new(),
            message: String::new(),
            stacktrace: None,
            information: BTreeMap::new(),
            status: TestStatus::Queued,
            requeued: false,
            environment: None,
            started: None,
            elapsed: None,
        }
    }

    pub fn with_suite(mut self, suite_name: impl Into<String>) -> Self {
        self.suite_name = suite_name.into();
        self
    }

    pub fn status(&self) -> TestStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    /// Whether the single allowed requeue has been used.
    pub fn is_requeued(&self) -> bool {
        self.requeued
    }

    /// Move to `next`, recording `message`. The clock starts on `Running` and
    /// stops on the first terminal status.
    pub fn set_status(&mut self, next: TestStatus, message: impl Into<String>) -> ResultResult<()> {
        let from = self.status;
        if !from.can_transition_to(next, self.requeued) {
            return Err(ResultError::InvalidTransition {
                name: self.name.clone(),
                from,
                to: next,
            });
        }
        if from == TestStatus::Assigned && next == TestStatus::Queued {
            self.requeued = true;
            self.environment = None;
        }
        if next == TestStatus::Running {
            self.started = Some(Instant::now());
        }
        if next.is_completed() {
            self.elapsed = Some(self.started.map(|s| s.elapsed()).unwrap_or_default());
        }
        self.status = next;
        self.message = message.into();
        obs::emit_result_status_changed(&self.id, &self.name, from, next);
        Ok(())
    }

    /// Attach metadata of the environment the result is assigned to.
    pub fn set_environment(&mut self, metadata: BTreeMap<String, String>) {
        self.environment = Some(metadata);
    }

    pub fn environment(&self) -> Option<&BTreeMap<String, String>> {
        self.environment.as_ref()
    }

    /// Seconds spent running; frozen once completed.
    pub fn elapsed(&self) -> f64 {
        match (self.elapsed, self.started) {
            (Some(elapsed), _) => elapsed.as_secs_f64(),
            (None, Some(started)) => started.elapsed().as_secs_f64(),
            (None, None) => 0.0,
        }
    }

    pub fn full_name(&self) -> String {
        if self.suite_name.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.suite_name, self.name)
        }
    }

    pub fn to_message(&self) -> TestResultMessage {
        TestResultMessage {
            time: Utc::now(),
            elapsed: self.elapsed(),
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status,
            message: self.message.clone(),
            stacktrace: self.stacktrace.clone(),
            information: self.information.clone(),
            full_name: self.full_name(),
            suite_name: self.suite_name.clone(),
            suite_full_name: self.suite_name.clone(),
            log_file: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut result = TestResult::new("verify_cpu_count").with_suite("core");
        result.set_status(TestStatus::Assigned, "").unwrap();
        result.set_status(TestStatus::Running, "").unwrap();
        result.set_status(TestStatus::Passed, "ok").unwrap();
        assert!(result.is_completed());
        assert_eq!(result.full_name(), "core.verify_cpu_count");
        let message = result.to_message();
        assert_eq!(message.status, TestStatus::Passed);
        assert_eq!(message.message, "ok");
    }

    #[test]
    fn test_requeue_once_then_rejected() {
        let mut result = TestResult::new("case");
        result.set_status(TestStatus::Assigned, "").unwrap();
        result.set_environment(BTreeMap::from([("platform".into(), "baremetal".into())]));
        result.set_status(TestStatus::Queued, "environment unsuitable").unwrap();
        assert!(result.environment().is_none());
        result.set_status(TestStatus::Assigned, "").unwrap();
        let err = result.set_status(TestStatus::Queued, "again").unwrap_err();
        assert_eq!(
            err,
            ResultError::InvalidTransition {
                name: "case".into(),
                from: TestStatus::Assigned,
                to: TestStatus::Queued,
            }
        );
        assert_eq!(result.status(), TestStatus::Assigned);
    }

    #[test]
    fn test_skipping_from_queue_is_allowed() {
        let mut result = TestResult::new("case");
        result.set_status(TestStatus::Skipped, "no environment").unwrap();
        assert!(result.is_completed());
        assert_eq!(result.elapsed(), 0.0);
    }

    #[test]
    fn test_completed_result_cannot_change() {
        let mut result = TestResult::new("case");
        result.set_status(TestStatus::Skipped, "").unwrap();
        assert!(result.set_status(TestStatus::Running, "").is_err());
    }
}
