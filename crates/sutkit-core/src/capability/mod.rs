//! Capability value model.
//!
//! Each type here describes one dimension of a node or environment. The same
//! type is used on both sides of a match: as a requirement (what a test case
//! asks for) and as a capability (what a candidate environment offers).

pub mod check;
pub mod count;
pub mod fixed;
pub mod range;
pub mod set;

pub use check::{
    check_dimension, check_wildcard, intersect_dimension, narrow_wildcard, CapabilityError,
    CapabilityResult, CapabilityValue, CheckResult,
};
pub use count::CountSpace;
pub use fixed::FixedValue;
pub use range::RangeValue;
pub use set::{Prioritized, SetValue};
