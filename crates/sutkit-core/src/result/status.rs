use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a single test result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    /// Created, not assigned to any environment yet.
    Queued,
    /// Assigned to an environment; may go back to `Queued` once.
    Assigned,
    Running,
    Failed,
    Passed,
    /// Will not run.
    Skipped,
    /// Failed with a known issue.
    Attempted,
}

impl TestStatus {
    pub const TERMINAL: [TestStatus; 4] = [
        TestStatus::Failed,
        TestStatus::Passed,
        TestStatus::Skipped,
        TestStatus::Attempted,
    ];

    /// True exactly for the four terminal statuses.
    pub fn is_completed(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    /// Allowed transitions. `requeued` records whether the single permitted
    /// `Assigned → Queued` step has already been taken.
    pub fn can_transition_to(self, next: TestStatus, requeued: bool) -> bool {
        use TestStatus::*;
        match (self, next) {
            (Queued, Assigned) | (Queued, Skipped) => true,
            (Assigned, Queued) => !requeued,
            (Assigned, Running) | (Assigned, Skipped) | (Assigned, Failed) => true,
            (Running, next) => next.is_completed(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Queued => "QUEUED",
            TestStatus::Assigned => "ASSIGNED",
            TestStatus::Running => "RUNNING",
            TestStatus::Failed => "FAILED",
            TestStatus::Passed => "PASSED",
            TestStatus::Skipped => "SKIPPED",
            TestStatus::Attempted => "ATTEMPTED",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::TestStatus::*;
    use super::*;

    #[test]
    fn test_is_completed_exactly_terminal() {
        for status in [Failed, Passed, Skipped, Attempted] {
            assert!(status.is_completed(), "{status}");
        }
        for status in [Queued, Assigned, Running] {
            assert!(!status.is_completed(), "{status}");
        }
    }

    #[test]
    fn test_requeue_allowed_once() {
        assert!(Assigned.can_transition_to(Queued, false));
        assert!(!Assigned.can_transition_to(Queued, true));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in TestStatus::TERMINAL {
            for to in [Queued, Assigned, Running, Failed, Passed, Skipped, Attempted] {
                assert!(!from.can_transition_to(to, false));
            }
        }
    }

    #[test]
    fn test_running_cannot_go_back() {
        assert!(!Running.can_transition_to(Assigned, false));
        assert!(!Running.can_transition_to(Queued, false));
        assert!(Running.can_transition_to(Attempted, false));
    }

    #[test]
    fn test_wire_form_is_uppercase() {
        assert_eq!(serde_json::to_string(&Attempted).unwrap(), "\"ATTEMPTED\"");
        assert_eq!(serde_json::from_str::<TestStatus>("\"QUEUED\"").unwrap(), Queued);
    }
}
