//! Clusters power-cycle the physical clients an environment runs on.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use sutkit_core::platform::{ConnectionInfo, Connector};
use sutkit_core::Environment;

use crate::config::{parse_settings, ClientConfig, ClusterConfig};
use crate::error::{BareMetalError, BareMetalResult};
use crate::registry::Registry;

#[async_trait]
pub trait Cluster: Send + Sync {
    fn type_name(&self) -> &str;

    /// Reset every client so it boots into the image under test.
    async fn deploy(&self, environment: &Environment) -> BareMetalResult<()>;
}

pub type ClusterRegistry = Registry<ClusterConfig, dyn Cluster>;

/// Registry with the built-in `rackmanager` cluster.
pub fn default_clusters() -> ClusterRegistry {
    let mut registry = ClusterRegistry::new("cluster");
    // a fresh registry has no entries to collide with
    let _ = registry.register(RackManager::TYPE_NAME, |config, connector| {
        Ok(Arc::new(RackManager::from_config(config, connector)?) as Arc<dyn Cluster>)
    });
    registry
}

#[derive(Debug, Deserialize)]
struct RackManagerSettings {
    connection: ConnectionInfo,
}

/// Chassis manager reached over a remote session; resets clients by port.
pub struct RackManager {
    connection: ConnectionInfo,
    clients: Vec<ClientConfig>,
    connector: Arc<dyn Connector>,
}

impl RackManager {
    pub const TYPE_NAME: &'static str = "rackmanager";

    pub fn from_config(
        config: &ClusterConfig,
        connector: Arc<dyn Connector>,
    ) -> BareMetalResult<Self> {
        let settings: RackManagerSettings =
            parse_settings("cluster", Self::TYPE_NAME, &config.settings)?;
        Ok(Self {
            connection: settings.connection,
            clients: config.client.clone(),
            connector,
        })
    }

    pub fn reset_command(management_port: u32) -> String {
        format!("set system reset -i {management_port}")
    }
}

#[async_trait]
impl Cluster for RackManager {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    async fn deploy(&self, environment: &Environment) -> BareMetalResult<()> {
        if self.clients.is_empty() {
            return Err(BareMetalError::NoClient {
                cluster: Self::TYPE_NAME.to_string(),
            });
        }
        // validate every port before touching hardware
        let ports = self
            .clients
            .iter()
            .enumerate()
            .map(|(index, client)| {
                client
                    .management_port
                    .ok_or(BareMetalError::MissingManagementPort { index })
            })
            .collect::<BareMetalResult<Vec<u32>>>()?;

        let session = self.connector.try_connect(&self.connection).await?;
        for port in ports {
            let command = Self::reset_command(port);
            let result = session.execute(&command, false, false).await?;
            if !result.success() {
                return Err(BareMetalError::CommandFailed {
                    command,
                    exit_code: result.exit_code,
                    output: result.stdout,
                });
            }
            tracing::debug!(
                environment = %environment.name,
                management_port = port,
                "client reset"
            );
        }
        tracing::info!(
            environment = %environment.name,
            clients = self.clients.len(),
            rack_manager = %self.connection.address,
            "clients have been reset"
        );
        Ok(())
    }
}
