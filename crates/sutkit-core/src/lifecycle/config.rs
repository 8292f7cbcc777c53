use serde::{Deserialize, Serialize};

/// Retry policy for opening node sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectRetryConfig {
    /// Maximum wall-clock time for a single attempt (milliseconds).
    pub timeout_ms: u64,
    /// Maximum number of retries (0 = no retries, connect once).
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries (milliseconds).
    pub backoff_base_ms: u64,
}

impl Default for ConnectRetryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 3,
            backoff_base_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub connect: ConnectRetryConfig,
    /// Hand released, clean environments to later compatible requirements.
    #[serde(default)]
    pub reuse_environments: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = LifecycleConfig::default();
        assert_eq!(cfg.connect.max_retries, 3);
        assert!(!cfg.reuse_environments);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: LifecycleConfig = serde_json::from_str(r#"{"reuse_environments": true}"#).unwrap();
        assert!(cfg.reuse_environments);
        assert_eq!(cfg.connect, ConnectRetryConfig::default());
    }
}
