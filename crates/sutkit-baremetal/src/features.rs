//! Features advertised by bare-metal nodes.
//!
//! Power is controlled by the cluster during deployment, so these are
//! placeholders that keep start/stop and serial-console cases runnable.

use async_trait::async_trait;
use sutkit_core::platform::{
    FeatureResult, PowerState, SerialConsole, StartStop, StopState,
};

#[derive(Debug, Default)]
pub struct BareMetalStartStop;

#[async_trait]
impl StartStop for BareMetalStartStop {
    async fn stop(&self, state: StopState) -> FeatureResult<()> {
        tracing::debug!(?state, "stop ignored on bare metal");
        Ok(())
    }

    async fn start(&self) -> FeatureResult<()> {
        Ok(())
    }

    async fn restart(&self) -> FeatureResult<()> {
        Ok(())
    }

    async fn status(&self) -> FeatureResult<String> {
        Ok(PowerState::Running.status_text().to_string())
    }
}

#[derive(Debug, Default)]
pub struct BareMetalSerialConsole;

#[async_trait]
impl SerialConsole for BareMetalSerialConsole {
    async fn console_log(&self) -> FeatureResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_stop_always_running() {
        let feature = BareMetalStartStop;
        feature.stop(StopState::Hibernate).await.unwrap();
        assert_eq!(feature.status().await.unwrap(), "VM running");
    }
}
