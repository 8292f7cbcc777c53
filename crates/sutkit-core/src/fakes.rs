//! In-memory fakes for platform, connector, feature and notifier contracts (testing only)
//!
//! Provides `FakePlatform`, `FakeConnector`, `FakeSession`, `FakeResize`,
//! `FakeStartStop` and `MemoryNotifier`. They record what was asked of them so
//! tests can assert on call order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::environment::Environment;
use crate::messages::Message;
use crate::notifier::Notifier;
use crate::platform::{
    ConnectionInfo, Connector, ExecuteResult, FeatureError, FeatureHandle, FeatureRegistry,
    FeatureResult, FeatureType, Platform, PlatformError, PlatformResult, PowerState,
    RemoteSession, Resize, ResizeAction, ResizeOutcome, SessionError, SessionResult, StartStop,
    StopState,
};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// FakePlatform
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct PlatformCalls {
    prepared: Vec<Uuid>,
    deployed: Vec<Uuid>,
    deleted: Vec<Uuid>,
}

/// Platform that "deploys" by filling in loopback connection info.
#[derive(Debug)]
pub struct FakePlatform {
    has_capacity: bool,
    deploy_error: Option<String>,
    delete_error: Option<String>,
    deploy_delay: Option<Duration>,
    resize: Option<Arc<FakeResize>>,
    calls: Mutex<PlatformCalls>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            has_capacity: true,
            deploy_error: None,
            delete_error: None,
            deploy_delay: None,
            resize: None,
            calls: Mutex::new(PlatformCalls::default()),
        }
    }

    /// `prepare_environment` reports no capacity.
    pub fn without_capacity(mut self) -> Self {
        self.has_capacity = false;
        self
    }

    pub fn failing_deploy(mut self, reason: impl Into<String>) -> Self {
        self.deploy_error = Some(reason.into());
        self
    }

    pub fn failing_delete(mut self, reason: impl Into<String>) -> Self {
        self.delete_error = Some(reason.into());
        self
    }

    /// Sleep inside `deploy_environment`, to exercise cancellation.
    pub fn with_deploy_delay(mut self, delay: Duration) -> Self {
        self.deploy_delay = Some(delay);
        self
    }

    pub fn with_resize(mut self, resize: FakeResize) -> Self {
        self.resize = Some(Arc::new(resize));
        self
    }

    pub fn prepared(&self) -> Vec<Uuid> {
        lock(&self.calls).prepared.clone()
    }

    pub fn deployed(&self) -> Vec<Uuid> {
        lock(&self.calls).deployed.clone()
    }

    /// Environment ids passed to `delete_environment`, in call order.
    pub fn deleted(&self) -> Vec<Uuid> {
        lock(&self.calls).deleted.clone()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    fn type_name(&self) -> &str {
        "fake"
    }

    fn supported_features(&self) -> Vec<FeatureType> {
        self.features().types()
    }

    fn features(&self) -> FeatureRegistry {
        let registry = FeatureRegistry::new().register(FeatureType::StartStop, |_node| {
            FeatureHandle::StartStop(Arc::new(FakeStartStop::default()))
        });
        match &self.resize {
            Some(resize) => {
                let resize = resize.clone();
                registry.register(FeatureType::Resize, move |_node| {
                    FeatureHandle::Resize(resize.clone())
                })
            }
            None => registry,
        }
    }

    async fn prepare_environment(&self, environment: &Environment) -> PlatformResult<bool> {
        lock(&self.calls).prepared.push(environment.id);
        Ok(self.has_capacity)
    }

    async fn deploy_environment(&self, environment: &mut Environment) -> PlatformResult<()> {
        if let Some(delay) = self.deploy_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = &self.deploy_error {
            return Err(PlatformError::Deployment(reason.clone()));
        }
        for node in environment.nodes.iter_mut() {
            node.connection = Some(ConnectionInfo::new(
                format!("127.0.0.{}", node.index + 1),
                "sutkit",
            ));
            node.information
                .insert("kernel_version".into(), "6.8.0-fake".into());
        }
        environment.set_information("platform", "fake");
        environment.set_information("host_version", "fake-host-1.0");
        environment.set_information("vmsize", "fake_small");
        lock(&self.calls).deployed.push(environment.id);
        Ok(())
    }

    async fn delete_environment(&self, environment: &Environment) -> PlatformResult<()> {
        lock(&self.calls).deleted.push(environment.id);
        match &self.delete_error {
            Some(reason) => Err(PlatformError::Delete(reason.clone())),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeConnector / FakeSession
// ---------------------------------------------------------------------------

/// Session that records commands and answers from a prefix table.
#[derive(Debug, Default)]
pub struct FakeSession {
    responses: Mutex<BTreeMap<String, ExecuteResult>>,
    commands: Mutex<Vec<String>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix`.
    pub fn respond(&self, prefix: impl Into<String>, exit_code: i32, stdout: impl Into<String>) {
        lock(&self.responses).insert(
            prefix.into(),
            ExecuteResult {
                exit_code,
                stdout: stdout.into(),
            },
        );
    }

    pub fn commands(&self) -> Vec<String> {
        lock(&self.commands).clone()
    }
}

#[async_trait]
impl RemoteSession for FakeSession {
    async fn execute(&self, command: &str, _sudo: bool, _shell: bool) -> SessionResult<ExecuteResult> {
        lock(&self.commands).push(command.to_string());
        let responses = lock(&self.responses);
        let found = responses
            .iter()
            .filter(|(prefix, _)| command.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, result)| result.clone());
        Ok(found.unwrap_or(ExecuteResult {
            exit_code: 0,
            stdout: String::new(),
        }))
    }
}

/// Connector that fails a configurable number of times before succeeding.
#[derive(Debug)]
pub struct FakeConnector {
    failures_left: AtomicU32,
    attempts: AtomicU32,
    never_connects: bool,
    session: Arc<FakeSession>,
    endpoints: Mutex<Vec<String>>,
}

impl Default for FakeConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeConnector {
    pub fn new() -> Self {
        Self {
            failures_left: AtomicU32::new(0),
            attempts: AtomicU32::new(0),
            never_connects: false,
            session: Arc::new(FakeSession::new()),
            endpoints: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_first(self, failures: u32) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.never_connects = true;
        self
    }

    pub fn with_session(mut self, session: Arc<FakeSession>) -> Self {
        self.session = session;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Endpoints of successful connections, in order.
    pub fn connected(&self) -> Vec<String> {
        lock(&self.endpoints).clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn try_connect(&self, info: &ConnectionInfo) -> SessionResult<Arc<dyn RemoteSession>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let transient = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if self.never_connects || transient {
            return Err(SessionError::Connect {
                endpoint: info.endpoint(),
                reason: "connection refused".into(),
            });
        }
        lock(&self.endpoints).push(info.endpoint());
        Ok(self.session.clone())
    }
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

/// Resize feature returning a fixed outcome.
#[derive(Debug)]
pub struct FakeResize {
    outcome: Result<ResizeOutcome, FeatureError>,
    calls: Mutex<Vec<ResizeAction>>,
}

impl FakeResize {
    pub fn succeeding(outcome: ResizeOutcome) -> Self {
        Self {
            outcome: Ok(outcome),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: FeatureError) -> Self {
        Self {
            outcome: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ResizeAction> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl Resize for FakeResize {
    async fn resize(&self, action: ResizeAction) -> FeatureResult<ResizeOutcome> {
        lock(&self.calls).push(action);
        self.outcome.clone()
    }
}

/// Start/stop feature tracking a power state in memory.
#[derive(Debug)]
pub struct FakeStartStop {
    state: Mutex<PowerState>,
}

impl Default for FakeStartStop {
    fn default() -> Self {
        Self {
            state: Mutex::new(PowerState::Running),
        }
    }
}

#[async_trait]
impl StartStop for FakeStartStop {
    async fn stop(&self, state: StopState) -> FeatureResult<()> {
        *lock(&self.state) = match state {
            StopState::Shutdown => PowerState::Stopped,
            StopState::Deallocate | StopState::Hibernate => PowerState::Deallocated,
        };
        Ok(())
    }

    async fn start(&self) -> FeatureResult<()> {
        *lock(&self.state) = PowerState::Running;
        Ok(())
    }

    async fn restart(&self) -> FeatureResult<()> {
        self.start().await
    }

    async fn status(&self) -> FeatureResult<String> {
        Ok(lock(&self.state).status_text().to_string())
    }
}

// ---------------------------------------------------------------------------
// MemoryNotifier
// ---------------------------------------------------------------------------

/// Notifier that keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<Message>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        lock(&self.messages).clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, message: &Message) {
        lock(&self.messages).push(message.clone());
    }
}
