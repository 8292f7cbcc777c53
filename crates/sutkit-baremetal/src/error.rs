use std::path::PathBuf;

use sutkit_core::platform::{PlatformError, SessionError};

#[derive(Debug, thiserror::Error)]
pub enum BareMetalError {
    #[error("no cluster is specified in the runbook")]
    NoCluster,

    #[error("no client is specified for {cluster} cluster")]
    NoClient { cluster: String },

    #[error("{cluster} cluster has {clients} client(s), environment needs {nodes}")]
    NotEnoughClients {
        cluster: String,
        clients: usize,
        nodes: usize,
    },

    #[error("unknown {kind} type: {type_name}")]
    UnknownType {
        kind: &'static str,
        type_name: String,
    },

    #[error("{kind} type {type_name} is already registered")]
    DuplicateType {
        kind: &'static str,
        type_name: String,
    },

    #[error("invalid {kind} settings for {type_name}: {source}")]
    InvalidSettings {
        kind: &'static str,
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("management_port is required for rackmanager client {index}")]
    MissingManagementPort { index: usize },

    #[error("`{command}` exited with {exit_code}: {output}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("{node} is not ready after {timeout_secs}s")]
    NotReady { node: String, timeout_secs: u64 },

    #[error("could not get ip from content of file {}", path.display())]
    IpNotFound { path: PathBuf },

    #[error("ip address of {node} is empty")]
    EmptyAddress { node: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

pub type BareMetalResult<T> = std::result::Result<T, BareMetalError>;

impl From<BareMetalError> for PlatformError {
    fn from(err: BareMetalError) -> Self {
        match err {
            BareMetalError::Session(err) => PlatformError::Session(err),
            other => PlatformError::Deployment(other.to_string()),
        }
    }
}
