//! Runbook `platform` section for bare-metal environments.
//!
//! Each typed block (`cluster`, `ready_checker`, `ip_getter`) carries a `type`
//! tag plus free-form settings. The settings stay untyped here and are parsed by
//! the implementation the tag selects, see [`parse_settings`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sutkit_core::platform::ConnectionInfo;

use crate::error::{BareMetalError, BareMetalResult};

fn default_cluster_type() -> String {
    "rackmanager".to_string()
}

fn default_file_single() -> String {
    "file_single".to_string()
}

fn default_ready_timeout() -> u64 {
    300
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BareMetalPlatformConfig {
    #[serde(default)]
    pub cluster: Vec<ClusterConfig>,
}

impl BareMetalPlatformConfig {
    /// Parse the runbook's `platform` value. A missing section is an empty config.
    pub fn from_value(value: Option<&Value>) -> BareMetalResult<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|source| {
                    BareMetalError::InvalidSettings {
                        kind: "platform",
                        type_name: "baremetal".into(),
                        source,
                    }
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(rename = "type", default = "default_cluster_type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_checker: Option<ReadyCheckerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_getter: Option<IpGetterConfig>,
    #[serde(default)]
    pub client: Vec<ClientConfig>,
    /// Type-specific settings, e.g. the rack manager's `connection`.
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            type_name: default_cluster_type(),
            ready_checker: None,
            ip_getter: None,
            client: Vec::new(),
            settings: Map::new(),
        }
    }
}

/// One machine behind the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_port: Option<u32>,
    #[serde(default)]
    pub iso_http_url: String,
    pub connection: ConnectionInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyCheckerConfig {
    #[serde(rename = "type", default = "default_file_single")]
    pub type_name: String,
    /// Seconds to wait for a node to come up.
    #[serde(default = "default_ready_timeout")]
    pub timeout: u64,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl Default for ReadyCheckerConfig {
    fn default() -> Self {
        Self {
            type_name: default_file_single(),
            timeout: default_ready_timeout(),
            settings: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpGetterConfig {
    #[serde(rename = "type", default = "default_file_single")]
    pub type_name: String,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl Default for IpGetterConfig {
    fn default() -> Self {
        Self {
            type_name: default_file_single(),
            settings: Map::new(),
        }
    }
}

/// Parse the flattened settings of a typed block into the selected type's schema.
pub fn parse_settings<S: DeserializeOwned>(
    kind: &'static str,
    type_name: &str,
    settings: &Map<String, Value>,
) -> BareMetalResult<S> {
    serde_json::from_value(Value::Object(settings.clone())).map_err(|source| {
        BareMetalError::InvalidSettings {
            kind,
            type_name: type_name.to_string(),
            source,
        }
    })
}
