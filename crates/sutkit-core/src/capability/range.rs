//! Ordered numeric ranges.
//!
//! A requirement range usually expresses a lower bound ("at least 4 GiB"); a
//! capability range expresses what a candidate can provide. Their intersection
//! is the overlap, and `current` is the concrete value picked from it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::check::{CapabilityResult, CapabilityValue, CheckResult};

/// Inclusive range over `u64`. `max = None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeValue {
    #[serde(default)]
    pub min: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
    /// Value picked by the last intersection. `None` on declared ranges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
    /// Pick the upper end of a narrowed range instead of the lower end.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub choose_max: bool,
}

impl RangeValue {
    pub fn at_least(min: u64) -> Self {
        Self {
            min,
            max: None,
            current: None,
            choose_max: false,
        }
    }

    pub fn between(min: u64, max: u64) -> Self {
        Self {
            min,
            max: Some(max),
            current: None,
            choose_max: false,
        }
    }

    pub fn exact(value: u64) -> Self {
        Self::between(value, value)
    }

    pub fn choosing_max(mut self) -> Self {
        self.choose_max = true;
        self
    }

    pub fn contains(&self, value: u64) -> bool {
        value >= self.min && self.max.map_or(true, |max| value <= max)
    }

    fn is_empty(&self) -> bool {
        matches!(self.max, Some(max) if max < self.min)
    }

    /// The overlap of two ranges, or `None` when they are disjoint.
    fn overlap(&self, other: &Self) -> Option<(u64, Option<u64>)> {
        let min = self.min.max(other.min);
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        match max {
            Some(max) if max < min => None,
            _ => Some((min, max)),
        }
    }
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", self.min),
            Some(max) => write!(f, "[{}, {}]", self.min, max),
            None => write!(f, "[{}, unbounded)", self.min),
        }
    }
}

impl CapabilityValue for RangeValue {
    fn check(&self, capability: &Self) -> CheckResult {
        if self.is_empty() {
            return CheckResult::fail(format!("requirement range {self} is empty"));
        }
        if capability.is_empty() {
            return CheckResult::fail(format!("capability range {capability} is empty"));
        }
        match self.overlap(capability) {
            Some(_) => CheckResult::ok(),
            None => CheckResult::fail(format!(
                "requirement {self} does not overlap capability {capability}"
            )),
        }
    }

    fn intersect(&self, capability: &Self) -> CapabilityResult<Self> {
        self.check(capability).into_result()?;
        // check() guarantees an overlap
        let (min, max) = self.overlap(capability).unwrap_or((self.min, self.max));
        let choose_max = self.choose_max || capability.choose_max;
        let current = match (choose_max, max) {
            (true, Some(max)) => max,
            _ => min,
        };
        Ok(Self {
            min,
            max,
            current: Some(current),
            choose_max,
        })
    }
}
