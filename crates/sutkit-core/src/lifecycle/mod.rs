//! Environment lifecycle: prepare, deploy, connect, release, delete.

pub mod config;
pub mod error;
pub mod manager;
pub mod retry;

pub use config::{ConnectRetryConfig, LifecycleConfig};
pub use error::{LifecycleError, LifecycleResult};
pub use manager::{EnvironmentManager, SharedEnvironment};
pub use retry::{retry_with_backoff, Attempted, RetryError};
