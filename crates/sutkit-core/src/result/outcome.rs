//! Skip-versus-fail classification of failure messages.
//!
//! Some provider failures mean the case could not run, not that it regressed.
//! They are recognized by fixed substrings of the failure text.

use serde::{Deserialize, Serialize};

use super::status::TestStatus;

/// Known failure substrings and the skip reason reported for each.
pub const SKIP_PATTERNS: &[(&str, &str)] = &[
    (
        "no available size for resizing",
        "No available VM size for resizing.",
    ),
    (
        "cannot find current vm size in eligible list",
        "Current VM size not in eligible list.",
    ),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Skipped { reason: String },
    Failed { message: String },
}

impl Outcome {
    pub fn status(&self) -> TestStatus {
        match self {
            Outcome::Skipped { .. } => TestStatus::Skipped,
            Outcome::Failed { .. } => TestStatus::Failed,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Skipped { reason } => reason,
            Outcome::Failed { message } => message,
        }
    }
}

/// Map a failure message to `Skipped` when it contains a known pattern.
pub fn classify_failure(text: &str) -> Outcome {
    SKIP_PATTERNS
        .iter()
        .find(|(pattern, _)| text.contains(pattern))
        .map(|(_, reason)| Outcome::Skipped {
            reason: (*reason).to_string(),
        })
        .unwrap_or_else(|| Outcome::Failed {
            message: text.to_string(),
        })
}
