//! Waiting for a provider power state after stop/start/hibernate.

use std::time::Duration;

use tokio::time::{sleep, Instant};

use super::feature::{FeatureError, FeatureResult, StartStop};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Running,
    Stopped,
    Deallocated,
}

impl PowerState {
    /// Status text as reported by [`StartStop::status`].
    pub fn status_text(self) -> &'static str {
        match self {
            PowerState::Running => "VM running",
            PowerState::Stopped => "VM stopped",
            PowerState::Deallocated => "VM deallocated",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            PowerState::Running => "running",
            PowerState::Stopped => "stopped",
            PowerState::Deallocated => "deallocated",
        }
    }
}

/// Poll `status()` until it reports `expected` or `timeout` elapses.
///
/// On timeout the error reads e.g. `VM is not in deallocated status after hibernation`.
pub async fn wait_for_power_state(
    start_stop: &dyn StartStop,
    expected: PowerState,
    operation: &str,
    timeout: Duration,
    poll: Duration,
) -> FeatureResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let status = start_stop.status().await?;
        if status == expected.status_text() {
            tracing::debug!(status = %status, operation, "power state reached");
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(FeatureError::PowerStateTimeout {
                expected: expected.short_name().to_string(),
                operation: operation.to_string(),
            });
        }
        sleep(poll).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeStartStop;
    use crate::platform::feature::StopState;

    #[tokio::test(start_paused = true)]
    async fn test_hibernate_reaches_deallocated() {
        let feature = FakeStartStop::default();
        feature.stop(StopState::Hibernate).await.unwrap();
        wait_for_power_state(
            &feature,
            PowerState::Deallocated,
            "hibernation",
            Duration::from_secs(900),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_deallocated_times_out_with_known_message() {
        let feature = FakeStartStop::default();
        let err = wait_for_power_state(
            &feature,
            PowerState::Deallocated,
            "hibernation",
            Duration::from_secs(60),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "VM is not in deallocated status after hibernation"
        );
    }
}
