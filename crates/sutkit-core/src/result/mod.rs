//! Test result state machine and skip classification.

pub mod outcome;
pub mod status;
pub mod test_result;

pub use outcome::{classify_failure, Outcome, SKIP_PATTERNS};
pub use status::TestStatus;
pub use test_result::{ResultError, ResultResult, TestResult};
