//! Pluggable feature settings.
//!
//! A node's `features` map is keyed by feature name. Each value is a tagged
//! variant that takes part in the same check/intersect protocol as the
//! built-in dimensions.

use serde::{Deserialize, Serialize};

use super::types::SecurityProfileType;
use crate::capability::{
    check_dimension, check_wildcard, intersect_dimension, narrow_wildcard, CapabilityError,
    CapabilityResult, CapabilityValue, CheckResult, CountSpace, FixedValue, SetValue,
};

/// Settings for the network interface feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkInterfaceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nic_count: Option<CountSpace>,
}

/// Settings for the security profile feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityProfileSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<SetValue<SecurityProfileType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypt_disk: Option<FixedValue<bool>>,
    /// Guest firmware image. Not matched; a value on the requirement wins.
    ///
    /// This is the one field whose intersection depends on argument order:
    /// when both sides name different images, `a ∩ b` keeps `a`'s and `b ∩ a`
    /// keeps `b`'s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub igvm: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureSettings {
    /// The feature exists; it has no tunables.
    Presence,
    NetworkInterface(NetworkInterfaceSettings),
    SecurityProfile(SecurityProfileSettings),
}

impl FeatureSettings {
    pub fn kind(&self) -> &'static str {
        match self {
            FeatureSettings::Presence => "presence",
            FeatureSettings::NetworkInterface(_) => "network_interface",
            FeatureSettings::SecurityProfile(_) => "security_profile",
        }
    }
}

impl CapabilityValue for FeatureSettings {
    fn check(&self, capability: &Self) -> CheckResult {
        match (self, capability) {
            (FeatureSettings::Presence, FeatureSettings::Presence) => CheckResult::ok(),
            (FeatureSettings::Presence, cap) => check_wildcard(cap),
            (FeatureSettings::NetworkInterface(req), FeatureSettings::NetworkInterface(cap)) => {
                let mut result = CheckResult::ok();
                result.merge(
                    check_dimension(req.nic_count.as_ref(), cap.nic_count.as_ref()),
                    "nic_count",
                );
                result
            }
            (FeatureSettings::SecurityProfile(req), FeatureSettings::SecurityProfile(cap)) => {
                let mut result = CheckResult::ok();
                result.merge(
                    check_dimension(req.profile.as_ref(), cap.profile.as_ref()),
                    "profile",
                );
                result.merge(
                    check_dimension(req.encrypt_disk.as_ref(), cap.encrypt_disk.as_ref()),
                    "encrypt_disk",
                );
                result
            }
            (req, cap) => CheckResult::fail(format!(
                "requires {} settings, capability declares {}",
                req.kind(),
                cap.kind()
            )),
        }
    }

    fn intersect(&self, capability: &Self) -> CapabilityResult<Self> {
        match (self, capability) {
            (FeatureSettings::Presence, FeatureSettings::Presence) => Ok(FeatureSettings::Presence),
            (FeatureSettings::Presence, cap) => narrow_wildcard(cap),
            (FeatureSettings::NetworkInterface(req), FeatureSettings::NetworkInterface(cap)) => {
                let nic_count = intersect_dimension(req.nic_count.as_ref(), cap.nic_count.as_ref())
                    .map_err(|e| e.within("nic_count"))?;
                Ok(FeatureSettings::NetworkInterface(NetworkInterfaceSettings {
                    nic_count,
                }))
            }
            (FeatureSettings::SecurityProfile(req), FeatureSettings::SecurityProfile(cap)) => {
                let profile = intersect_dimension(req.profile.as_ref(), cap.profile.as_ref())
                    .map_err(|e| e.within("profile"))?;
                let encrypt_disk =
                    intersect_dimension(req.encrypt_disk.as_ref(), cap.encrypt_disk.as_ref())
                        .map_err(|e| e.within("encrypt_disk"))?;
                Ok(FeatureSettings::SecurityProfile(SecurityProfileSettings {
                    profile,
                    encrypt_disk,
                    igvm: req.igvm.clone().or_else(|| cap.igvm.clone()),
                }))
            }
            (req, cap) => Err(CapabilityError::incompatible(format!(
                "requires {} settings, capability declares {}",
                req.kind(),
                cap.kind()
            ))),
        }
    }
}
