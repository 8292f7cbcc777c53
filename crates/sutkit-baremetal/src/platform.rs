//! The `baremetal` platform.
//!
//! Deployment power-cycles physical clients through the first configured
//! cluster, waits for them to boot and fills in each node's connection. Only
//! one cluster is used per platform; extra entries are ignored.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sutkit_core::platform::{
    Connector, FeatureHandle, FeatureRegistry, FeatureType, Platform, PlatformResult,
};
use sutkit_core::Environment;

use crate::cluster::{default_clusters, ClusterRegistry};
use crate::config::{BareMetalPlatformConfig, ClusterConfig};
use crate::error::{BareMetalError, BareMetalResult};
use crate::features::{BareMetalSerialConsole, BareMetalStartStop};
use crate::ip_getter::{default_ip_getters, IpGetterRegistry};
use crate::ready_checker::{default_ready_checkers, ReadyCheckerRegistry};

pub struct BareMetalPlatform {
    config: BareMetalPlatformConfig,
    connector: Arc<dyn Connector>,
    clusters: ClusterRegistry,
    ready_checkers: ReadyCheckerRegistry,
    ip_getters: IpGetterRegistry,
}

impl BareMetalPlatform {
    pub const TYPE_NAME: &'static str = "baremetal";

    pub fn new(config: BareMetalPlatformConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            clusters: default_clusters(),
            ready_checkers: default_ready_checkers(),
            ip_getters: default_ip_getters(),
        }
    }

    /// Build from the runbook's `platform` section.
    pub fn from_runbook(
        platform: Option<&Value>,
        connector: Arc<dyn Connector>,
    ) -> BareMetalResult<Self> {
        Ok(Self::new(
            BareMetalPlatformConfig::from_value(platform)?,
            connector,
        ))
    }

    pub fn config(&self) -> &BareMetalPlatformConfig {
        &self.config
    }

    pub fn clusters_mut(&mut self) -> &mut ClusterRegistry {
        &mut self.clusters
    }

    pub fn ready_checkers_mut(&mut self) -> &mut ReadyCheckerRegistry {
        &mut self.ready_checkers
    }

    pub fn ip_getters_mut(&mut self) -> &mut IpGetterRegistry {
        &mut self.ip_getters
    }

    fn cluster_config(&self) -> BareMetalResult<&ClusterConfig> {
        self.config.cluster.first().ok_or(BareMetalError::NoCluster)
    }

    async fn deploy(&self, environment: &mut Environment) -> BareMetalResult<()> {
        let config = self.cluster_config()?;
        let cluster = self
            .clusters
            .create(&config.type_name, config, self.connector.clone())?;
        if config.client.is_empty() {
            return Err(BareMetalError::NoClient {
                cluster: config.type_name.clone(),
            });
        }
        if config.client.len() < environment.nodes.len() {
            return Err(BareMetalError::NotEnoughClients {
                cluster: config.type_name.clone(),
                clients: config.client.len(),
                nodes: environment.nodes.len(),
            });
        }

        let ready_checker = config
            .ready_checker
            .as_ref()
            .map(|rc| {
                self.ready_checkers
                    .create(&rc.type_name, rc, self.connector.clone())
            })
            .transpose()?;
        let ip_getter = config
            .ip_getter
            .as_ref()
            .map(|ig| self.ip_getters.create(&ig.type_name, ig, self.connector.clone()))
            .transpose()?;

        if let Some(checker) = &ready_checker {
            checker.clean_up().await?;
        }

        for (node, client) in environment.nodes.iter_mut().zip(&config.client) {
            node.connection = Some(client.connection.clone());
            if !client.iso_http_url.is_empty() {
                node.information
                    .insert("iso_http_url".into(), client.iso_http_url.clone());
            }
        }

        cluster.deploy(environment).await?;

        for (index, node) in environment.nodes.iter_mut().enumerate() {
            if let Some(checker) = &ready_checker {
                checker.is_ready(node).await?;
            }
            if let Some(getter) = &ip_getter {
                let address = getter.get_ip(node).await?;
                if let Some(connection) = node.connection.as_mut() {
                    connection.address = address;
                }
            }
            node.name = format!("node_{index}");
            let has_address = node
                .connection
                .as_ref()
                .is_some_and(|c| !c.address.is_empty());
            if !has_address {
                return Err(BareMetalError::EmptyAddress {
                    node: node.name.clone(),
                });
            }
        }

        environment.set_information("platform", Self::TYPE_NAME);
        environment.set_information("cluster", cluster.type_name());
        tracing::info!(
            environment = %environment.name,
            cluster = cluster.type_name(),
            nodes = environment.nodes.len(),
            "bare-metal environment deployed"
        );
        Ok(())
    }
}

#[async_trait]
impl Platform for BareMetalPlatform {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn supported_features(&self) -> Vec<FeatureType> {
        vec![FeatureType::StartStop, FeatureType::SerialConsole]
    }

    fn features(&self) -> FeatureRegistry {
        FeatureRegistry::new()
            .register(FeatureType::StartStop, |_node| {
                FeatureHandle::StartStop(Arc::new(BareMetalStartStop))
            })
            .register(FeatureType::SerialConsole, |_node| {
                FeatureHandle::SerialConsole(Arc::new(BareMetalSerialConsole))
            })
    }

    /// Capacity is the number of clients behind the first cluster.
    async fn prepare_environment(&self, environment: &Environment) -> PlatformResult<bool> {
        let Ok(config) = self.cluster_config() else {
            // surfaced as a deployment error with a proper message
            return Ok(true);
        };
        let enough = config.client.len() >= environment.nodes.len();
        if !enough {
            tracing::warn!(
                environment = %environment.name,
                clients = config.client.len(),
                nodes = environment.nodes.len(),
                "not enough bare-metal clients"
            );
        }
        Ok(enough)
    }

    async fn deploy_environment(&self, environment: &mut Environment) -> PlatformResult<()> {
        self.deploy(environment).await.map_err(Into::into)
    }
}

impl std::fmt::Debug for BareMetalPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BareMetalPlatform")
            .field("config", &self.config)
            .field("clusters", &self.clusters)
            .field("ready_checkers", &self.ready_checkers)
            .field("ip_getters", &self.ip_getters)
            .finish()
    }
}
