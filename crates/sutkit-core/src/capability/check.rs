//! The requirement/capability protocol shared by every capability dimension.

use serde::{Deserialize, Serialize};

/// Outcome of checking a requirement against a capability.
///
/// Compatible when `reasons` is empty. Every reason names the dimension it
/// came from once it has been merged into a composite result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub reasons: Vec<String>,
}

impl CheckResult {
    /// A compatible result.
    pub fn ok() -> Self {
        Self::default()
    }

    /// An incompatible result with a single reason.
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            reasons: vec![reason.into()],
        }
    }

    /// Whether the requirement is satisfied.
    pub fn is_compatible(&self) -> bool {
        self.reasons.is_empty()
    }

    pub fn add_reason(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    /// Merge a nested result, prefixing each of its reasons with `dimension`.
    pub fn merge(&mut self, other: CheckResult, dimension: &str) {
        for reason in other.reasons {
            self.reasons.push(format!("{dimension}: {reason}"));
        }
    }

    /// Convert into a `CapabilityResult`, carrying the reasons on failure.
    pub fn into_result(self) -> CapabilityResult<()> {
        if self.is_compatible() {
            Ok(())
        } else {
            Err(CapabilityError::Incompatible {
                reasons: self.reasons,
            })
        }
    }
}

/// Errors produced while narrowing a requirement by a capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    #[error("incompatible capability: {}", reasons.join("; "))]
    Incompatible { reasons: Vec<String> },
}

impl CapabilityError {
    pub fn incompatible(reason: impl Into<String>) -> Self {
        CapabilityError::Incompatible {
            reasons: vec![reason.into()],
        }
    }

    /// Prefix every reason with the dimension it belongs to.
    pub fn within(self, dimension: &str) -> Self {
        match self {
            CapabilityError::Incompatible { reasons } => CapabilityError::Incompatible {
                reasons: reasons
                    .into_iter()
                    .map(|r| format!("{dimension}: {r}"))
                    .collect(),
            },
        }
    }

    pub fn reasons(&self) -> &[String] {
        match self {
            CapabilityError::Incompatible { reasons } => reasons,
        }
    }
}

/// Result type for capability narrowing.
pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;

/// A single capability dimension that can act as a requirement or a capability.
///
/// `self` plays the requirement role, the argument plays the capability role.
/// For compatible pairs `intersect` must be idempotent and must agree with
/// `check`: `intersect` fails exactly when `check` reports a reason.
pub trait CapabilityValue: Sized + Clone {
    /// Non-mutating compatibility test.
    fn check(&self, capability: &Self) -> CheckResult;

    /// Narrow this requirement by `capability`, choosing a concrete `current`.
    fn intersect(&self, capability: &Self) -> CapabilityResult<Self>;
}

const UNUSABLE: &str = "capability declares no usable value";

/// Check an optional dimension. An unset requirement is a wildcard.
pub fn check_dimension<T: CapabilityValue>(
    requirement: Option<&T>,
    capability: Option<&T>,
) -> CheckResult {
    match (requirement, capability) {
        (None, None) => CheckResult::ok(),
        (None, Some(cap)) => check_wildcard(cap),
        (Some(_), None) => CheckResult::fail("capability does not declare this dimension"),
        (Some(req), Some(cap)) => req.check(cap),
    }
}

/// Intersect an optional dimension.
///
/// An unset requirement takes the capability narrowed by itself, so the result
/// carries a concrete `current` and intersecting it again changes nothing.
pub fn intersect_dimension<T: CapabilityValue>(
    requirement: Option<&T>,
    capability: Option<&T>,
) -> CapabilityResult<Option<T>> {
    match (requirement, capability) {
        (None, None) => Ok(None),
        (None, Some(cap)) => narrow_wildcard(cap).map(Some),
        (Some(_), None) => Err(CapabilityError::incompatible(
            "capability does not declare this dimension",
        )),
        (Some(req), Some(cap)) => req.intersect(cap).map(Some),
    }
}

/// Check a capability against a wildcard. Only a capability that allows
/// nothing (an empty set, say) is incompatible.
pub fn check_wildcard<T: CapabilityValue>(capability: &T) -> CheckResult {
    if capability.check(capability).is_compatible() {
        CheckResult::ok()
    } else {
        CheckResult::fail(UNUSABLE)
    }
}

/// Narrow a capability matched by a wildcard by itself.
pub fn narrow_wildcard<T: CapabilityValue>(capability: &T) -> CapabilityResult<T> {
    capability
        .intersect(capability)
        .map_err(|_| CapabilityError::incompatible(UNUSABLE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::RangeValue;

    #[test]
    fn test_merge_prefixes_dimension() {
        let mut result = CheckResult::ok();
        result.merge(CheckResult::fail("too small"), "core_count");
        assert_eq!(result.reasons, vec!["core_count: too small".to_string()]);
        assert!(!result.is_compatible());
    }

    #[test]
    fn test_into_result() {
        assert!(CheckResult::ok().into_result().is_ok());
        let err = CheckResult::fail("nope").into_result().unwrap_err();
        assert_eq!(err.reasons(), &["nope".to_string()]);
    }

    #[test]
    fn test_wildcard_dimension_picks_current() {
        let capability = RangeValue::between(2, 16);
        let once = intersect_dimension(None, Some(&capability)).unwrap().unwrap();
        assert_eq!(once.current, Some(2));
        let twice = intersect_dimension(Some(&once), Some(&capability))
            .unwrap()
            .unwrap();
        assert_eq!(once, twice);
        assert_eq!(intersect_dimension::<RangeValue>(None, None).unwrap(), None);
    }

    #[test]
    fn test_wildcard_rejects_capability_that_allows_nothing() {
        let empty = RangeValue::between(8, 2);
        let check = check_dimension(None, Some(&empty));
        assert_eq!(check.reasons, vec![UNUSABLE.to_string()]);
        let err = intersect_dimension(None, Some(&empty)).unwrap_err();
        assert_eq!(err.reasons(), &[UNUSABLE.to_string()]);
    }

    #[test]
    fn test_error_within_prefixes_all_reasons() {
        let err = CapabilityError::Incompatible {
            reasons: vec!["a".into(), "b".into()],
        }
        .within("disk_type");
        assert_eq!(err.reasons(), &["disk_type: a", "disk_type: b"]);
        assert!(err.to_string().contains("disk_type: a; disk_type: b"));
    }
}
