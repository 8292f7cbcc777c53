//! IP getters find the address a freshly booted client picked up.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use sutkit_core::Node;

use crate::config::{parse_settings, IpGetterConfig};
use crate::error::{BareMetalError, BareMetalResult};
use crate::registry::Registry;

#[async_trait]
pub trait IpGetter: Send + Sync {
    fn type_name(&self) -> &str;

    async fn get_ip(&self, node: &Node) -> BareMetalResult<String>;
}

pub type IpGetterRegistry = Registry<IpGetterConfig, dyn IpGetter>;

pub fn default_ip_getters() -> IpGetterRegistry {
    let mut registry = IpGetterRegistry::new("ip_getter");
    let _ = registry.register(FileSingleIpGetter::TYPE_NAME, |config, _| {
        Ok(Arc::new(FileSingleIpGetter::from_config(config)?) as Arc<dyn IpGetter>)
    });
    registry
}

#[derive(Debug, Deserialize)]
struct FileSingleSettings {
    file: PathBuf,
}

/// Reads the first dotted address from a file, e.g. `ipaddr=10.0.3.17`.
#[derive(Debug)]
pub struct FileSingleIpGetter {
    file: PathBuf,
    pattern: Regex,
}

impl FileSingleIpGetter {
    pub const TYPE_NAME: &'static str = "file_single";

    pub fn new(file: impl Into<PathBuf>) -> BareMetalResult<Self> {
        Ok(Self {
            file: file.into(),
            pattern: Regex::new(r"(?P<ip_addr>\d+(?:\.\d+)+)")?,
        })
    }

    pub fn from_config(config: &IpGetterConfig) -> BareMetalResult<Self> {
        let settings: FileSingleSettings =
            parse_settings("ip_getter", Self::TYPE_NAME, &config.settings)?;
        Self::new(settings.file)
    }

    fn find(&self, content: &str) -> Option<String> {
        self.pattern
            .captures(content)
            .and_then(|caps| caps.name("ip_addr"))
            .map(|m| m.as_str().to_string())
    }
}

#[async_trait]
impl IpGetter for FileSingleIpGetter {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    async fn get_ip(&self, node: &Node) -> BareMetalResult<String> {
        let content = tokio::fs::read_to_string(&self.file)
            .await
            .map_err(|source| BareMetalError::Io {
                path: self.file.clone(),
                source,
            })?;
        let address = self.find(&content).ok_or_else(|| BareMetalError::IpNotFound {
            path: self.file.clone(),
        })?;
        tracing::debug!(node = %node.name, address = %address, "ip read from file");
        Ok(address)
    }
}
