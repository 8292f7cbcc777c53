//! Ready checkers decide when a power-cycled client has finished booting.
//!
//! `file_single` waits for a marker file that the booted image (or a PXE/ISO
//! server hook) drops on shared storage. `ssh` waits until a session opens.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sutkit_core::platform::Connector;
use sutkit_core::Node;

use crate::config::{parse_settings, ReadyCheckerConfig};
use crate::error::{BareMetalError, BareMetalResult};
use crate::registry::Registry;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[async_trait]
pub trait ReadyChecker: Send + Sync {
    fn type_name(&self) -> &str;

    /// Reset state left by a previous deployment. Runs before the power-cycle.
    async fn clean_up(&self) -> BareMetalResult<()> {
        Ok(())
    }

    /// Wait until `node` is up, or fail with [`BareMetalError::NotReady`].
    async fn is_ready(&self, node: &Node) -> BareMetalResult<()>;
}

pub type ReadyCheckerRegistry = Registry<ReadyCheckerConfig, dyn ReadyChecker>;

/// Registry with the built-in `file_single` and `ssh` checkers.
pub fn default_ready_checkers() -> ReadyCheckerRegistry {
    let mut registry = ReadyCheckerRegistry::new("ready_checker");
    let _ = registry.register(FileSingleChecker::TYPE_NAME, |config, _| {
        Ok(Arc::new(FileSingleChecker::from_config(config)?) as Arc<dyn ReadyChecker>)
    });
    let _ = registry.register(SshChecker::TYPE_NAME, |config, connector| {
        Ok(Arc::new(SshChecker::new(connector, config.timeout)) as Arc<dyn ReadyChecker>)
    });
    registry
}

#[derive(Debug, Deserialize)]
struct FileSingleSettings {
    file: PathBuf,
}

#[derive(Debug)]
pub struct FileSingleChecker {
    file: PathBuf,
    timeout: Duration,
}

impl FileSingleChecker {
    pub const TYPE_NAME: &'static str = "file_single";

    pub fn new(file: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            file: file.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ReadyCheckerConfig) -> BareMetalResult<Self> {
        let settings: FileSingleSettings =
            parse_settings("ready_checker", Self::TYPE_NAME, &config.settings)?;
        Ok(Self::new(settings.file, Duration::from_secs(config.timeout)))
    }

    fn exists(&self) -> BareMetalResult<bool> {
        self.file.try_exists().map_err(|source| BareMetalError::Io {
            path: self.file.clone(),
            source,
        })
    }
}

#[async_trait]
impl ReadyChecker for FileSingleChecker {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    async fn clean_up(&self) -> BareMetalResult<()> {
        match std::fs::remove_file(&self.file) {
            Ok(()) => {
                tracing::debug!(file = %self.file.display(), "ready file removed");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(file = %self.file.display(), "no ready file to clean up");
                Ok(())
            }
            Err(source) => Err(BareMetalError::Io {
                path: self.file.clone(),
                source,
            }),
        }
    }

    async fn is_ready(&self, node: &Node) -> BareMetalResult<()> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        loop {
            if self.exists()? {
                tracing::debug!(node = %node.name, file = %self.file.display(), "ready file found");
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BareMetalError::NotReady {
                    node: node.name.clone(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Ready once a session to the node's connection opens.
pub struct SshChecker {
    connector: Arc<dyn Connector>,
    timeout: Duration,
}

impl SshChecker {
    pub const TYPE_NAME: &'static str = "ssh";

    pub fn new(connector: Arc<dyn Connector>, timeout_secs: u64) -> Self {
        Self {
            connector,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl ReadyChecker for SshChecker {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    async fn is_ready(&self, node: &Node) -> BareMetalResult<()> {
        let not_ready = || BareMetalError::NotReady {
            node: node.name.clone(),
            timeout_secs: self.timeout.as_secs(),
        };
        let connection = node.connection.as_ref().ok_or_else(not_ready)?;
        let attempt = async {
            loop {
                match self.connector.try_connect(connection).await {
                    Ok(_session) => return,
                    Err(err) => {
                        tracing::debug!(node = %node.name, error = %err, "node not reachable yet");
                        tokio::time::sleep(POLL_INTERVAL).await;
                    }
                }
            }
        };
        tokio::time::timeout(self.timeout, attempt)
            .await
            .map_err(|_| not_ready())?;
        tracing::debug!(node = %node.name, "node is reachable");
        Ok(())
    }
}
