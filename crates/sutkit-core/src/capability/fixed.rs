//! Fixed scalar capability: compatible only on equality.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use super::check::{CapabilityResult, CapabilityValue, CheckResult};

/// A single concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixedValue<T>(pub T);

impl<T> FixedValue<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &T {
        &self.0
    }
}

impl<T: Clone + PartialEq + Debug> CapabilityValue for FixedValue<T> {
    fn check(&self, capability: &Self) -> CheckResult {
        if self.0 == capability.0 {
            CheckResult::ok()
        } else {
            CheckResult::fail(format!(
                "requires {:?}, capability is {:?}",
                self.0, capability.0
            ))
        }
    }

    fn intersect(&self, capability: &Self) -> CapabilityResult<Self> {
        self.check(capability).into_result()?;
        Ok(capability.clone())
    }
}
