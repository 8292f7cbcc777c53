//! Enumerated sets with a total priority order over the domain.

use std::collections::BTreeSet;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use super::check::{CapabilityResult, CapabilityValue, CheckResult};

/// A finite domain with a documented preference order.
///
/// `PRIORITY` lists every member of the domain, most preferred first. When a
/// set intersection leaves several candidates, the one ranked first becomes
/// `current`.
pub trait Prioritized: Copy + Ord + Debug + 'static {
    const PRIORITY: &'static [Self];

    /// Position in `PRIORITY`; values missing from the list rank last.
    fn rank(self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|p| *p == self)
            .unwrap_or(Self::PRIORITY.len())
    }
}

/// A set of allowed values plus the value chosen by intersection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize",
    deserialize = "T: Deserialize<'de> + Ord"
))]
pub struct SetValue<T: Ord> {
    pub items: BTreeSet<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<T>,
}

impl<T: Prioritized> SetValue<T> {
    pub fn of(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: items.into_iter().collect(),
            current: None,
        }
    }

    /// Every member of the domain.
    pub fn any() -> Self {
        Self::of(T::PRIORITY.iter().copied())
    }

    pub fn contains(&self, item: T) -> bool {
        self.items.contains(&item)
    }

    /// Highest priority member of the set.
    pub fn preferred(&self) -> Option<T> {
        self.items.iter().copied().min_by_key(|item| (item.rank(), *item))
    }
}

impl<T: Prioritized> CapabilityValue for SetValue<T> {
    fn check(&self, capability: &Self) -> CheckResult {
        if capability.items.is_empty() {
            return CheckResult::fail("capability set is empty");
        }
        if self.items.is_empty() {
            return CheckResult::fail("requirement set is empty");
        }
        if self.items.is_disjoint(&capability.items) {
            return CheckResult::fail(format!(
                "requires one of {:?}, capability offers {:?}",
                self.items, capability.items
            ));
        }
        CheckResult::ok()
    }

    fn intersect(&self, capability: &Self) -> CapabilityResult<Self> {
        self.check(capability).into_result()?;
        let mut result = Self {
            items: self
                .items
                .intersection(&capability.items)
                .copied()
                .collect(),
            current: None,
        };
        result.current = result.preferred();
        Ok(result)
    }
}
