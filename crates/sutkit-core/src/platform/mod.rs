//! Platform, feature and connector contracts.
//!
//! A platform turns a resolved [`Environment`] into running machines. This
//! crate never talks to a provider directly; backends implement [`Platform`].

pub mod connector;
pub mod feature;
pub mod power;

use async_trait::async_trait;

use crate::environment::Environment;

pub use connector::{
    ConnectionInfo, Connector, ExecuteResult, RemoteSession, SessionError, SessionResult,
};
pub use feature::{
    FeatureError, FeatureFactory, FeatureHandle, FeatureRegistry, FeatureResult, FeatureType,
    NetworkInterface, Resize, ResizeAction, ResizeOutcome, SecurityProfile, SerialConsole,
    StartStop, StopState,
};
pub use power::{wait_for_power_state, PowerState};

/// Errors raised by platform backends.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("deployment failed: {0}")]
    Deployment(String),

    #[error("not enough capacity to deploy: {0}")]
    Capacity(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

#[async_trait]
pub trait Platform: Send + Sync {
    /// Short type tag, e.g. `"baremetal"`.
    fn type_name(&self) -> &str;

    fn supported_features(&self) -> Vec<FeatureType>;

    /// Factories for every supported feature.
    fn features(&self) -> FeatureRegistry;

    /// Check that the environment can be deployed at all. `Ok(false)` means
    /// the platform lacks capacity right now.
    async fn prepare_environment(&self, _environment: &Environment) -> PlatformResult<bool> {
        Ok(true)
    }

    /// Provision the environment's nodes. Platforms fill in node connection info.
    async fn deploy_environment(&self, environment: &mut Environment) -> PlatformResult<()>;

    async fn delete_environment(&self, _environment: &Environment) -> PlatformResult<()> {
        Ok(())
    }
}
