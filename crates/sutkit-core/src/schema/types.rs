//! Enumerated capability domains and their priority lists.

use serde::{Deserialize, Serialize};

use crate::capability::Prioritized;

/// How a node's network traffic reaches the NIC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NetworkDataPath {
    Synthetic,
    Sriov,
}

impl Prioritized for NetworkDataPath {
    // SR-IOV is preferred when both are available.
    const PRIORITY: &'static [Self] = &[NetworkDataPath::Sriov, NetworkDataPath::Synthetic];
}

impl NetworkDataPath {
    pub fn as_str(self) -> &'static str {
        match self {
            NetworkDataPath::Synthetic => "Synthetic",
            NetworkDataPath::Sriov => "Sriov",
        }
    }
}

/// OS disk type, cheapest first in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiskType {
    #[serde(rename = "StandardHDDLRS")]
    StandardHddLrs,
    #[serde(rename = "StandardSSDLRS")]
    StandardSsdLrs,
    Ephemeral,
    #[serde(rename = "PremiumSSDLRS")]
    PremiumSsdLrs,
    #[serde(rename = "PremiumV2SSDLRS")]
    PremiumV2SsdLrs,
    #[serde(rename = "UltraSSD")]
    UltraSsd,
}

impl Prioritized for DiskType {
    const PRIORITY: &'static [Self] = &[
        DiskType::StandardHddLrs,
        DiskType::StandardSsdLrs,
        DiskType::Ephemeral,
        DiskType::PremiumSsdLrs,
        DiskType::PremiumV2SsdLrs,
        DiskType::UltraSsd,
    ];
}

/// Security profile of a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SecurityProfileType {
    Standard,
    SecureBoot,
    #[serde(rename = "CVM")]
    Cvm,
    Stateless,
}

impl Prioritized for SecurityProfileType {
    const PRIORITY: &'static [Self] = &[
        SecurityProfileType::Standard,
        SecurityProfileType::SecureBoot,
        SecurityProfileType::Cvm,
        SecurityProfileType::Stateless,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&DiskType::PremiumSsdLrs).unwrap(),
            "\"PremiumSSDLRS\""
        );
        assert_eq!(
            serde_json::to_string(&SecurityProfileType::Cvm).unwrap(),
            "\"CVM\""
        );
        assert_eq!(
            serde_json::from_str::<NetworkDataPath>("\"Sriov\"").unwrap(),
            NetworkDataPath::Sriov
        );
    }

    #[test]
    fn test_sriov_ranks_first() {
        assert!(NetworkDataPath::Sriov.rank() < NetworkDataPath::Synthetic.rank());
        assert_eq!(DiskType::StandardHddLrs.rank(), 0);
    }
}
