//! Feature contracts and the type-tag registry that instantiates them.
//!
//! A feature is a backend-specific capability plus behavior (resize a VM,
//! power-cycle it, read its serial console). Platforms register one factory per
//! [`FeatureType`]; the lifecycle manager calls each factory once per node at
//! deploy time.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::environment::Node;
use crate::schema::{FeatureSettings, NodeSpace, SecurityProfileSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureType {
    Resize,
    StartStop,
    SerialConsole,
    NetworkInterface,
    SecurityProfile,
}

impl FeatureType {
    pub const ALL: [FeatureType; 5] = [
        FeatureType::Resize,
        FeatureType::StartStop,
        FeatureType::SerialConsole,
        FeatureType::NetworkInterface,
        FeatureType::SecurityProfile,
    ];

    /// Name used as the key in a node's `features` map.
    pub fn name(self) -> &'static str {
        match self {
            FeatureType::Resize => "Resize",
            FeatureType::StartStop => "StartStop",
            FeatureType::SerialConsole => "SerialConsole",
            FeatureType::NetworkInterface => "NetworkInterface",
            FeatureType::SecurityProfile => "SecurityProfile",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureType {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| FeatureError::UnknownType(s.to_string()))
    }
}

/// Feature failures.
///
/// The resize messages are matched by substring downstream to decide whether a
/// case is skipped, so their text must not change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeatureError {
    #[error("no available size for resizing")]
    NoAvailableSize,

    #[error("cannot find current vm size in eligible list: {current}")]
    CurrentSizeNotEligible { current: String },

    #[error("feature {feature} is not supported on node {node}")]
    Unsupported { feature: FeatureType, node: String },

    #[error("unknown feature type: {0}")]
    UnknownType(String),

    #[error("VM is not in {expected} status after {operation}")]
    PowerStateTimeout { expected: String, operation: String },

    #[error("{feature} failed: {reason}")]
    Operation { feature: FeatureType, reason: String },
}

pub type FeatureResult<T> = std::result::Result<T, FeatureError>;

// ── Feature contracts ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeAction {
    IncreaseCoreCount,
    DecreaseCoreCount,
    RandomResize,
}

/// What a resize produced: the node's new capability and the size names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeOutcome {
    pub capability: NodeSpace,
    pub old_size: String,
    pub new_size: String,
}

#[async_trait]
pub trait Resize: Send + Sync {
    fn settings(&self) -> FeatureSettings {
        FeatureSettings::Presence
    }

    async fn resize(&self, action: ResizeAction) -> FeatureResult<ResizeOutcome>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopState {
    #[default]
    Shutdown,
    Deallocate,
    Hibernate,
}

#[async_trait]
pub trait StartStop: Send + Sync {
    fn settings(&self) -> FeatureSettings {
        FeatureSettings::Presence
    }

    async fn stop(&self, state: StopState) -> FeatureResult<()>;
    async fn start(&self) -> FeatureResult<()>;
    async fn restart(&self) -> FeatureResult<()>;
    /// Provider power-state text, e.g. `"VM running"`.
    async fn status(&self) -> FeatureResult<String>;
}

#[async_trait]
pub trait SerialConsole: Send + Sync {
    fn settings(&self) -> FeatureSettings {
        FeatureSettings::Presence
    }

    async fn console_log(&self) -> FeatureResult<Vec<u8>>;
}

#[async_trait]
pub trait NetworkInterface: Send + Sync {
    fn settings(&self) -> FeatureSettings;

    async fn attach_nics(&self, extra_count: u32) -> FeatureResult<()>;
    async fn remove_extra_nics(&self) -> FeatureResult<()>;
    async fn switch_sriov(&self, enable: bool) -> FeatureResult<()>;
    async fn is_sriov_enabled(&self) -> FeatureResult<bool>;
    async fn nic_count(&self) -> FeatureResult<u32>;
}

/// Security profile is declarative only.
pub trait SecurityProfile: Send + Sync {
    fn profile(&self) -> SecurityProfileSettings;
}

/// A feature instance attached to a node.
#[derive(Clone)]
pub enum FeatureHandle {
    Resize(Arc<dyn Resize>),
    StartStop(Arc<dyn StartStop>),
    SerialConsole(Arc<dyn SerialConsole>),
    NetworkInterface(Arc<dyn NetworkInterface>),
    SecurityProfile(Arc<dyn SecurityProfile>),
}

impl FeatureHandle {
    pub fn feature_type(&self) -> FeatureType {
        match self {
            FeatureHandle::Resize(_) => FeatureType::Resize,
            FeatureHandle::StartStop(_) => FeatureType::StartStop,
            FeatureHandle::SerialConsole(_) => FeatureType::SerialConsole,
            FeatureHandle::NetworkInterface(_) => FeatureType::NetworkInterface,
            FeatureHandle::SecurityProfile(_) => FeatureType::SecurityProfile,
        }
    }

    /// Settings this instance declares as capability.
    pub fn settings(&self) -> FeatureSettings {
        match self {
            FeatureHandle::Resize(f) => f.settings(),
            FeatureHandle::StartStop(f) => f.settings(),
            FeatureHandle::SerialConsole(f) => f.settings(),
            FeatureHandle::NetworkInterface(f) => f.settings(),
            FeatureHandle::SecurityProfile(f) => FeatureSettings::SecurityProfile(f.profile()),
        }
    }
}

impl fmt::Debug for FeatureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FeatureHandle")
            .field(&self.feature_type())
            .finish()
    }
}

// ── Registry ───────────────────────────────────────────────────────────

pub type FeatureFactory = Arc<dyn Fn(&Node) -> FeatureHandle + Send + Sync>;

/// Type tag → factory lookup table, built once when a platform is constructed.
#[derive(Clone, Default)]
pub struct FeatureRegistry {
    factories: BTreeMap<FeatureType, FeatureFactory>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, feature: FeatureType, factory: F) -> Self
    where
        F: Fn(&Node) -> FeatureHandle + Send + Sync + 'static,
    {
        self.factories.insert(feature, Arc::new(factory));
        self
    }

    pub fn contains(&self, feature: FeatureType) -> bool {
        self.factories.contains_key(&feature)
    }

    pub fn types(&self) -> Vec<FeatureType> {
        self.factories.keys().copied().collect()
    }

    /// Instantiate `feature` for `node`.
    pub fn create(&self, feature: FeatureType, node: &Node) -> FeatureResult<FeatureHandle> {
        let factory = self
            .factories
            .get(&feature)
            .ok_or_else(|| FeatureError::Unsupported {
                feature,
                node: node.name.clone(),
            })?;
        let handle = factory(node);
        if handle.feature_type() != feature {
            return Err(FeatureError::Operation {
                feature,
                reason: format!("factory produced a {} feature", handle.feature_type()),
            });
        }
        Ok(handle)
    }
}

impl fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureRegistry")
            .field("types", &self.types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeStartStop;

    #[test]
    fn test_feature_type_round_trips_by_name() {
        for ty in FeatureType::ALL {
            assert_eq!(ty.name().parse::<FeatureType>().unwrap(), ty);
        }
        assert_eq!(
            "Hibernation".parse::<FeatureType>().unwrap_err(),
            FeatureError::UnknownType("Hibernation".into())
        );
    }

    #[test]
    fn test_resize_error_text_is_stable() {
        assert_eq!(
            FeatureError::NoAvailableSize.to_string(),
            "no available size for resizing"
        );
        let err = FeatureError::CurrentSizeNotEligible {
            current: "Standard_D2s_v3".into(),
        };
        assert!(err
            .to_string()
            .contains("cannot find current vm size in eligible list"));
    }

    #[test]
    fn test_registry_creates_registered_feature() {
        let registry = FeatureRegistry::new().register(FeatureType::StartStop, |_node| {
            FeatureHandle::StartStop(Arc::new(FakeStartStop::default()))
        });
        let node = Node::new(0, NodeSpace::default());
        let handle = registry.create(FeatureType::StartStop, &node).unwrap();
        assert_eq!(handle.feature_type(), FeatureType::StartStop);
        assert_eq!(handle.settings(), FeatureSettings::Presence);

        let err = registry.create(FeatureType::Resize, &node).unwrap_err();
        assert!(matches!(err, FeatureError::Unsupported { feature: FeatureType::Resize, .. }));
    }

    #[test]
    fn test_registry_rejects_mismatched_factory() {
        let registry = FeatureRegistry::new().register(FeatureType::Resize, |_node| {
            FeatureHandle::StartStop(Arc::new(FakeStartStop::default()))
        });
        let node = Node::new(0, NodeSpace::default());
        assert!(matches!(
            registry.create(FeatureType::Resize, &node),
            Err(FeatureError::Operation { .. })
        ));
    }
}
