//! Count spaces: a set of allowed counts combined with min/max bounds.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::check::{CapabilityResult, CapabilityValue, CheckResult};

/// Allowed counts for a countable dimension such as cores or NICs.
///
/// When `counts` is empty every value within `[min, max]` is allowed. When it
/// is non-empty only the listed values within the bounds are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountSpace {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub counts: BTreeSet<u32>,
    #[serde(default)]
    pub min: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<u32>,
}

impl CountSpace {
    pub fn exact(count: u32) -> Self {
        Self {
            counts: BTreeSet::from([count]),
            min: count,
            max: Some(count),
            current: None,
        }
    }

    pub fn at_least(min: u32) -> Self {
        Self {
            min,
            ..Self::default()
        }
    }

    pub fn between(min: u32, max: u32) -> Self {
        Self {
            min,
            max: Some(max),
            ..Self::default()
        }
    }

    pub fn one_of(counts: impl IntoIterator<Item = u32>) -> Self {
        Self {
            counts: counts.into_iter().collect(),
            ..Self::default()
        }
    }

    fn in_bounds(&self, value: u32) -> bool {
        value >= self.min && self.max.map_or(true, |max| value <= max)
    }

    /// Allowed explicit counts, restricted to the bounds.
    fn bounded_counts(&self) -> BTreeSet<u32> {
        self.counts
            .iter()
            .copied()
            .filter(|c| self.in_bounds(*c))
            .collect()
    }

    fn is_empty(&self) -> bool {
        match self.max {
            Some(max) if max < self.min => true,
            _ => !self.counts.is_empty() && self.bounded_counts().is_empty(),
        }
    }

    /// Compute the narrowed space without validating it.
    fn narrow(&self, other: &Self) -> Self {
        let min = self.min.max(other.min);
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let counts: BTreeSet<u32> = match (self.counts.is_empty(), other.counts.is_empty()) {
            (true, true) => BTreeSet::new(),
            (false, true) => self.counts.clone(),
            (true, false) => other.counts.clone(),
            (false, false) => self.counts.intersection(&other.counts).copied().collect(),
        };
        let explicit = !(self.counts.is_empty() && other.counts.is_empty());
        let mut narrowed = Self {
            counts,
            min,
            max,
            current: None,
        };
        narrowed.counts = narrowed.bounded_counts();
        if explicit && narrowed.counts.is_empty() {
            // keep the emptiness observable to check()
            narrowed.max = Some(0);
            narrowed.min = 1;
        }
        narrowed
    }
}

impl fmt::Display for CountSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.counts.is_empty() {
            let list: Vec<String> = self.counts.iter().map(u32::to_string).collect();
            return write!(f, "{{{}}}", list.join(", "));
        }
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", self.min),
            Some(max) => write!(f, "[{}, {}]", self.min, max),
            None => write!(f, "[{}, unbounded)", self.min),
        }
    }
}

impl CapabilityValue for CountSpace {
    fn check(&self, capability: &Self) -> CheckResult {
        if self.is_empty() {
            return CheckResult::fail(format!("requirement count {self} allows nothing"));
        }
        if capability.is_empty() {
            return CheckResult::fail(format!("capability count {capability} allows nothing"));
        }
        if self.narrow(capability).is_empty() {
            return CheckResult::fail(format!(
                "requirement count {self} is not available in capability {capability}"
            ));
        }
        CheckResult::ok()
    }

    fn intersect(&self, capability: &Self) -> CapabilityResult<Self> {
        self.check(capability).into_result()?;
        let mut narrowed = self.narrow(capability);
        narrowed.current = Some(
            narrowed
                .counts
                .iter()
                .next()
                .copied()
                .unwrap_or(narrowed.min),
        );
        Ok(narrowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_overlap_picks_smallest() {
        let result = CountSpace::at_least(4)
            .intersect(&CountSpace::between(2, 16))
            .unwrap();
        assert_eq!(result.min, 4);
        assert_eq!(result.max, Some(16));
        assert_eq!(result.current, Some(4));
    }

    #[test]
    fn test_explicit_counts_filtered_by_bounds() {
        let capability = CountSpace::one_of([2, 4, 8, 16]);
        let result = CountSpace::at_least(5).intersect(&capability).unwrap();
        assert_eq!(result.counts, BTreeSet::from([8, 16]));
        assert_eq!(result.current, Some(8));
    }

    #[test]
    fn test_disjoint_explicit_counts_incompatible() {
        let requirement = CountSpace::one_of([3, 5]);
        let capability = CountSpace::one_of([2, 4]);
        let check = requirement.check(&capability);
        assert!(!check.is_compatible());
        assert!(requirement.intersect(&capability).is_err());
    }

    #[test]
    fn test_exact_count_outside_range() {
        let check = CountSpace::exact(32).check(&CountSpace::between(1, 16));
        assert!(!check.is_compatible());
        assert!(check.reasons[0].contains("32"));
    }

    #[test]
    fn test_intersection_is_idempotent() {
        let capability = CountSpace::one_of([2, 4, 8]);
        let once = CountSpace::at_least(3).intersect(&capability).unwrap();
        let twice = once.intersect(&capability).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_display() {
        assert_eq!(CountSpace::one_of([1, 2]).to_string(), "{1, 2}");
        assert_eq!(CountSpace::between(1, 4).to_string(), "[1, 4]");
        assert_eq!(CountSpace::at_least(2).to_string(), "[2, unbounded)");
    }
}
