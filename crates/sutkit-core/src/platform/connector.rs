//! Remote session contracts.
//!
//! The transport itself (SSH, serial, agent) lives outside this crate. The
//! lifecycle manager only needs to open a session per node; test bodies use
//! [`RemoteSession::execute`].

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::secret::Secret;

fn default_port() -> u16 {
    22
}

/// Where and how to reach a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_file: Option<PathBuf>,
}

impl ConnectionInfo {
    pub fn new(address: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port: default_port(),
            username: username.into(),
            password: None,
            private_key_file: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<Secret>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Output of a remote command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResult {
    pub exit_code: i32,
    pub stdout: String,
}

impl ExecuteResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("command `{command}` failed: {reason}")]
    Execute { command: String, reason: String },
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// An open session on a node.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    async fn execute(&self, command: &str, sudo: bool, shell: bool)
        -> SessionResult<ExecuteResult>;
}

/// Opens sessions. A single call is one attempt; the caller owns retries.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn try_connect(&self, info: &ConnectionInfo) -> SessionResult<Arc<dyn RemoteSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_info_defaults_port_and_redacts_password() {
        let info: ConnectionInfo = serde_json::from_str(
            r#"{"address":"10.0.0.4","username":"root","password":"hunter2"}"#,
        )
        .unwrap();
        assert_eq!(info.port, 22);
        assert_eq!(info.endpoint(), "10.0.0.4:22");
        assert!(!format!("{info:?}").contains("hunter2"));
        assert_eq!(info.password.as_ref().unwrap().expose(), "hunter2");
    }
}
