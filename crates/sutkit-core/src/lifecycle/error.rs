//! Error types for the lifecycle manager.

use crate::environment::EnvironmentError;
use crate::platform::PlatformError;
use crate::resolver::ResolveError;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("no environment available: {}", reasons.join("; "))]
    NoEnvironmentAvailable { reasons: Vec<String> },

    #[error("deployment of {environment} failed: {source}")]
    Deployment {
        environment: String,
        #[source]
        source: PlatformError,
    },

    #[error("cannot connect to {node} after {attempts} attempt(s): {reason}")]
    Connection {
        node: String,
        attempts: u32,
        reason: String,
    },

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("{operation} cancelled")]
    Cancelled { operation: &'static str },
}

impl LifecycleError {
    /// Whether the case should be reported as skipped rather than failed.
    pub fn is_skip(&self) -> bool {
        matches!(self, LifecycleError::NoEnvironmentAvailable { .. })
    }

    /// Whether the platform reported missing capacity, so the case may be requeued.
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            LifecycleError::Deployment {
                source: PlatformError::Capacity(_),
                ..
            }
        )
    }
}

impl From<ResolveError> for LifecycleError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NoEnvironmentAvailable { reasons } => {
                LifecycleError::NoEnvironmentAvailable { reasons }
            }
        }
    }
}

pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;
