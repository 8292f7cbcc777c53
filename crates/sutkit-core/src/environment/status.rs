use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle position of an environment.
///
/// Forward order is `New → Prepared → Deployed → Connected`. `Deleted` is
/// reachable from every state and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnvironmentStatus {
    New,
    Prepared,
    Deployed,
    Connected,
    Deleted,
}

impl EnvironmentStatus {
    pub fn can_transition_to(self, next: EnvironmentStatus) -> bool {
        use EnvironmentStatus::*;
        matches!(
            (self, next),
            (New, Prepared) | (Prepared, Deployed) | (Deployed, Connected)
        ) || (next == Deleted && self != Deleted)
    }

    /// Whether the platform has provisioned anything.
    pub fn is_deployed(self) -> bool {
        matches!(self, EnvironmentStatus::Deployed | EnvironmentStatus::Connected)
    }
}

impl fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EnvironmentStatus::New => "new",
            EnvironmentStatus::Prepared => "prepared",
            EnvironmentStatus::Deployed => "deployed",
            EnvironmentStatus::Connected => "connected",
            EnvironmentStatus::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::EnvironmentStatus::*;

    #[test]
    fn test_forward_transitions_only() {
        assert!(New.can_transition_to(Prepared));
        assert!(Prepared.can_transition_to(Deployed));
        assert!(Deployed.can_transition_to(Connected));
        assert!(!New.can_transition_to(Deployed));
        assert!(!Connected.can_transition_to(Deployed));
        assert!(!Prepared.can_transition_to(New));
    }

    #[test]
    fn test_deleted_reachable_from_anywhere_and_terminal() {
        for status in [New, Prepared, Deployed, Connected] {
            assert!(status.can_transition_to(Deleted));
        }
        for status in [New, Prepared, Deployed, Connected, Deleted] {
            assert!(!Deleted.can_transition_to(status));
        }
    }
}
