use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::feature_settings::FeatureSettings;
use super::types::{DiskType, NetworkDataPath};
use crate::capability::{
    check_dimension, check_wildcard, intersect_dimension, narrow_wildcard, CapabilityError,
    CapabilityResult, CapabilityValue, CheckResult, CountSpace, RangeValue, SetValue,
};

/// Capability record of a single node.
///
/// Used both as a requirement (unset dimensions are wildcards) and as the
/// capability of a candidate node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeSpace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_count: Option<CountSpace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<RangeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_type: Option<SetValue<DiskType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_data_path: Option<SetValue<NetworkDataPath>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, FeatureSettings>,
}

impl NodeSpace {
    pub fn with_core_count(mut self, core_count: CountSpace) -> Self {
        self.core_count = Some(core_count);
        self
    }

    pub fn with_memory_mb(mut self, memory_mb: RangeValue) -> Self {
        self.memory_mb = Some(memory_mb);
        self
    }

    pub fn with_disk_type(mut self, disk_type: SetValue<DiskType>) -> Self {
        self.disk_type = Some(disk_type);
        self
    }

    pub fn with_network_data_path(mut self, data_path: SetValue<NetworkDataPath>) -> Self {
        self.network_data_path = Some(data_path);
        self
    }

    pub fn with_feature(mut self, name: impl Into<String>, settings: FeatureSettings) -> Self {
        self.features.insert(name.into(), settings);
        self
    }

    /// The data path chosen by resolution, or the most preferred path offered
    /// on a space that was never resolved.
    pub fn current_data_path(&self) -> Option<NetworkDataPath> {
        self.network_data_path
            .as_ref()
            .and_then(|dp| dp.current.or_else(|| dp.preferred()))
    }

    /// Stable SHA-256 over the canonical JSON form.
    ///
    /// Field order is fixed by the struct and maps are ordered, so equal
    /// values always produce equal digests.
    pub fn digest(&self) -> serde_json::Result<String> {
        digest_json(self)
    }
}

impl CapabilityValue for NodeSpace {
    /// Collects every incompatible dimension rather than stopping at the first.
    fn check(&self, capability: &Self) -> CheckResult {
        let mut result = CheckResult::ok();
        result.merge(
            check_dimension(self.core_count.as_ref(), capability.core_count.as_ref()),
            "core_count",
        );
        result.merge(
            check_dimension(self.memory_mb.as_ref(), capability.memory_mb.as_ref()),
            "memory_mb",
        );
        result.merge(
            check_dimension(self.disk_type.as_ref(), capability.disk_type.as_ref()),
            "disk_type",
        );
        result.merge(
            check_dimension(
                self.network_data_path.as_ref(),
                capability.network_data_path.as_ref(),
            ),
            "network_data_path",
        );
        result.merge(check_features(&self.features, &capability.features), "features");
        result
    }

    fn intersect(&self, capability: &Self) -> CapabilityResult<Self> {
        let core_count = intersect_dimension(self.core_count.as_ref(), capability.core_count.as_ref())
            .map_err(|e| e.within("core_count"))?;
        let memory_mb = intersect_dimension(self.memory_mb.as_ref(), capability.memory_mb.as_ref())
            .map_err(|e| e.within("memory_mb"))?;
        let disk_type = intersect_dimension(self.disk_type.as_ref(), capability.disk_type.as_ref())
            .map_err(|e| e.within("disk_type"))?;
        let network_data_path = intersect_dimension(
            self.network_data_path.as_ref(),
            capability.network_data_path.as_ref(),
        )
        .map_err(|e| e.within("network_data_path"))?;
        let features = intersect_features(&self.features, &capability.features)
            .map_err(|e| e.within("features"))?;
        Ok(NodeSpace {
            core_count,
            memory_mb,
            disk_type,
            network_data_path,
            features,
        })
    }
}

/// Check a feature map. A feature missing from the capability is incompatible.
pub(crate) fn check_features(
    requirement: &BTreeMap<String, FeatureSettings>,
    capability: &BTreeMap<String, FeatureSettings>,
) -> CheckResult {
    let mut result = CheckResult::ok();
    for (name, req) in requirement {
        match capability.get(name) {
            Some(cap) => result.merge(req.check(cap), name),
            None => result.add_reason(format!("{name}: capability does not support this feature")),
        }
    }
    for (name, cap) in capability {
        if !requirement.contains_key(name) {
            result.merge(check_wildcard(cap), name);
        }
    }
    result
}

/// Intersect a feature map. Capability-only features are kept, narrowed by
/// themselves like any other wildcard dimension.
pub(crate) fn intersect_features(
    requirement: &BTreeMap<String, FeatureSettings>,
    capability: &BTreeMap<String, FeatureSettings>,
) -> CapabilityResult<BTreeMap<String, FeatureSettings>> {
    let mut merged = BTreeMap::new();
    for (name, req) in requirement {
        let cap = capability.get(name).ok_or_else(|| {
            CapabilityError::incompatible(format!("{name}: capability does not support this feature"))
        })?;
        merged.insert(name.clone(), req.intersect(cap).map_err(|e| e.within(name))?);
    }
    for (name, cap) in capability {
        if !requirement.contains_key(name) {
            merged.insert(name.clone(), narrow_wildcard(cap).map_err(|e| e.within(name))?);
        }
    }
    Ok(merged)
}

pub(crate) fn digest_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
