//! Environment lifecycle manager.
//!
//! Owns every environment it creates, drives them through the platform, and
//! guarantees each one is deleted exactly once. Access to a single environment
//! is serialized by its own async mutex; the tracking list is guarded by a
//! short-lived std mutex that is never held across an `.await`.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::config::LifecycleConfig;
use super::error::{LifecycleError, LifecycleResult};
use super::retry::{retry_with_backoff, RetryError};
use crate::capability::CapabilityValue;
use crate::environment::{Environment, EnvironmentError, EnvironmentStatus};
use crate::metrics::METRICS;
use crate::obs;
use crate::platform::{Connector, FeatureRegistry, Platform, PlatformError};
use crate::resolver::resolve;
use crate::schema::EnvironmentSpace;

/// An environment shared between the manager and the case that uses it.
pub type SharedEnvironment = Arc<tokio::sync::Mutex<Environment>>;

struct Tracked {
    id: Uuid,
    environment: SharedEnvironment,
}

pub struct EnvironmentManager {
    platform: Arc<dyn Platform>,
    connector: Arc<dyn Connector>,
    features: FeatureRegistry,
    candidates: Vec<EnvironmentSpace>,
    config: LifecycleConfig,
    cancel: CancellationToken,
    // acquisition order; shutdown walks it backwards
    tracked: Mutex<Vec<Tracked>>,
}

impl EnvironmentManager {
    pub fn new(
        platform: Arc<dyn Platform>,
        connector: Arc<dyn Connector>,
        candidates: Vec<EnvironmentSpace>,
        config: LifecycleConfig,
    ) -> Self {
        let features = platform.features();
        Self {
            platform,
            connector,
            features,
            candidates,
            config,
            cancel: CancellationToken::new(),
            tracked: Mutex::new(Vec::new()),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn candidates(&self) -> &[EnvironmentSpace] {
        &self.candidates
    }

    /// Number of environments created and not yet deleted.
    pub fn tracked_count(&self) -> usize {
        self.lock_tracked().len()
    }

    fn lock_tracked(&self) -> std::sync::MutexGuard<'_, Vec<Tracked>> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Vec<SharedEnvironment> {
        self.lock_tracked()
            .iter()
            .map(|t| t.environment.clone())
            .collect()
    }

    fn untrack(&self, id: Uuid) {
        self.lock_tracked().retain(|t| t.id != id);
    }

    async fn cancellable<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = T>,
    ) -> LifecycleResult<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(LifecycleError::Cancelled { operation }),
            out = fut => Ok(out),
        }
    }

    // ── prepare ────────────────────────────────────────────────────────

    /// Resolve `requirement` into an environment in `New` state, or reuse an
    /// idle one when reuse is enabled.
    pub async fn prepare(&self, requirement: &EnvironmentSpace) -> LifecycleResult<SharedEnvironment> {
        if self.config.reuse_environments {
            if let Some(shared) = self.find_reusable(requirement) {
                return Ok(shared);
            }
        }

        let matched = resolve(requirement, &self.candidates)?;
        let mut environment = Environment::from_match(matched);
        environment.set_in_use(true);
        let id = environment.id;
        obs::emit_environment_prepared(&id.to_string(), &environment.name, false);
        METRICS.inc_prepared();

        let shared = Arc::new(tokio::sync::Mutex::new(environment));
        self.lock_tracked().push(Tracked {
            id,
            environment: shared.clone(),
        });
        Ok(shared)
    }

    /// An idle, clean, deployed environment that the same resolution would produce.
    fn find_reusable(&self, requirement: &EnvironmentSpace) -> Option<SharedEnvironment> {
        for shared in self.snapshot() {
            // busy environments are not candidates
            let Ok(mut env) = shared.try_lock() else {
                continue;
            };
            if env.is_in_use() || env.is_dirty() || !env.status().is_deployed() {
                continue;
            }
            let Some(candidate) = self.candidates.get(env.candidate_index) else {
                continue;
            };
            let same = requirement
                .intersect(candidate)
                .map(|space| space == env.space)
                .unwrap_or(false);
            if same {
                env.set_in_use(true);
                obs::emit_environment_prepared(&env.id.to_string(), &env.name, true);
                METRICS.inc_reused();
                drop(env);
                return Some(shared);
            }
        }
        None
    }

    // ── deploy ─────────────────────────────────────────────────────────

    /// Provision the environment through the platform.
    ///
    /// Status reflects progress on failure: `New` if preparation failed,
    /// `Prepared` if deployment failed. Already deployed environments are left
    /// untouched.
    pub async fn deploy(&self, shared: &SharedEnvironment) -> LifecycleResult<()> {
        let mut env = shared.lock().await;
        let span = obs::environment_span(&env.id.to_string(), &env.name);
        self.deploy_locked(&mut env).instrument(span).await
    }

    async fn deploy_locked(&self, env: &mut Environment) -> LifecycleResult<()> {
        match env.status() {
            EnvironmentStatus::Deployed | EnvironmentStatus::Connected => return Ok(()),
            EnvironmentStatus::Deleted => {
                return Err(EnvironmentError::InvalidState {
                    environment: env.name.clone(),
                    operation: "deploy",
                    status: EnvironmentStatus::Deleted,
                }
                .into());
            }
            EnvironmentStatus::New => {
                let ready = self
                    .cancellable("prepare", self.platform.prepare_environment(env))
                    .await?;
                match ready {
                    Ok(true) => env.set_status(EnvironmentStatus::Prepared)?,
                    Ok(false) => {
                        let reason = format!(
                            "{} cannot host {}",
                            self.platform.type_name(),
                            env.name
                        );
                        return Err(self.deployment_failed(env, PlatformError::Capacity(reason)));
                    }
                    Err(err) => return Err(self.deployment_failed(env, err)),
                }
            }
            EnvironmentStatus::Prepared => {}
        }

        let deployed = self
            .cancellable("deploy", self.platform.deploy_environment(env))
            .await?;
        if let Err(err) = deployed {
            return Err(self.deployment_failed(env, err));
        }

        for index in 0..env.nodes.len() {
            for feature in self.features.types() {
                match self.features.create(feature, &env.nodes[index]) {
                    Ok(handle) => env.nodes[index].attach_feature(handle),
                    Err(err) => return Err(self.deployment_failed(env, err.into())),
                }
            }
        }

        env.set_status(EnvironmentStatus::Deployed)?;
        METRICS.inc_deployed();
        obs::emit_environment_deployed(
            &env.id.to_string(),
            self.platform.type_name(),
            env.nodes.len(),
        );
        Ok(())
    }

    fn deployment_failed(&self, env: &Environment, source: PlatformError) -> LifecycleError {
        METRICS.inc_deployment_failures();
        tracing::warn!(status = %env.status(), error = %source, "deployment failed");
        LifecycleError::Deployment {
            environment: env.name.clone(),
            source,
        }
    }

    // ── connect ────────────────────────────────────────────────────────

    /// Open a session on every node, retrying each with bounded backoff.
    pub async fn connect(&self, shared: &SharedEnvironment) -> LifecycleResult<()> {
        let mut env = shared.lock().await;
        let span = obs::environment_span(&env.id.to_string(), &env.name);
        self.connect_locked(&mut env).instrument(span).await
    }

    async fn connect_locked(&self, env: &mut Environment) -> LifecycleResult<()> {
        match env.status() {
            EnvironmentStatus::Connected => return Ok(()),
            EnvironmentStatus::Deployed => {}
            status => {
                return Err(EnvironmentError::InvalidState {
                    environment: env.name.clone(),
                    operation: "connect",
                    status,
                }
                .into());
            }
        }

        let connector = &self.connector;
        let mut total_attempts = 0;
        for node in env.nodes.iter_mut() {
            let info = node
                .connection
                .clone()
                .ok_or_else(|| LifecycleError::Connection {
                    node: node.name.clone(),
                    attempts: 0,
                    reason: "platform did not provide connection info".into(),
                })?;
            let outcome = retry_with_backoff(&self.config.connect, &self.cancel, |_| {
                connector.try_connect(&info)
            })
            .await;
            match outcome {
                Ok(attempted) => {
                    total_attempts += attempted.attempts;
                    node.set_session(attempted.value);
                    tracing::debug!(node = %node.name, endpoint = %info.endpoint(), "session opened");
                }
                Err(RetryError::Cancelled) => {
                    return Err(LifecycleError::Cancelled {
                        operation: "connect",
                    });
                }
                Err(RetryError::Exhausted { attempts, reason }) => {
                    return Err(LifecycleError::Connection {
                        node: node.name.clone(),
                        attempts,
                        reason,
                    });
                }
            }
        }

        env.set_status(EnvironmentStatus::Connected)?;
        obs::emit_environment_connected(&env.id.to_string(), env.nodes.len(), total_attempts);
        Ok(())
    }

    // ── dirty / release / delete ───────────────────────────────────────

    pub async fn mark_dirty(&self, shared: &SharedEnvironment) -> LifecycleResult<()> {
        shared.lock().await.mark_dirty()?;
        Ok(())
    }

    /// Hand the environment back after a case. Dirty or undeployed environments
    /// are deleted; clean ones become available for reuse.
    pub async fn release(&self, shared: &SharedEnvironment) {
        let reusable = {
            let mut env = shared.lock().await;
            let reusable = self.config.reuse_environments
                && !env.is_dirty()
                && env.status().is_deployed();
            if reusable {
                env.set_in_use(false);
            }
            reusable
        };
        if !reusable {
            self.delete(shared).await;
        }
    }

    /// Release platform resources. Idempotent and infallible: platform errors
    /// are logged and counted, and the environment always ends `Deleted`.
    pub async fn delete(&self, shared: &SharedEnvironment) {
        let mut env = shared.lock().await;
        let from = env.status();
        if from == EnvironmentStatus::Deleted {
            return;
        }
        let id = env.id;
        let span = obs::environment_span(&id.to_string(), &env.name);
        async {
            // nothing was provisioned for a New environment
            if from != EnvironmentStatus::New {
                if let Err(err) = self.platform.delete_environment(&env).await {
                    METRICS.inc_delete_failures();
                    obs::emit_environment_delete_failed(&id.to_string(), &err);
                }
            }
            let dirty = env.is_dirty();
            env.force_deleted();
            METRICS.inc_deleted();
            obs::emit_environment_deleted(&id.to_string(), from, dirty);
        }
        .instrument(span)
        .await;
        drop(env);
        self.untrack(id);
    }

    /// Delete every tracked environment, most recently acquired first.
    pub async fn shutdown(&self) {
        let tracked = std::mem::take(&mut *self.lock_tracked());
        tracing::info!(environments = tracked.len(), "shutting down environments");
        for entry in tracked.into_iter().rev() {
            self.delete(&entry.environment).await;
        }
        METRICS.flush();
    }

    /// Prepare, deploy and connect an environment, run `body`, then release it.
    ///
    /// The environment is deleted on every error path, including errors from
    /// `body`.
    pub async fn run_scoped<T, E, F, Fut>(&self, requirement: &EnvironmentSpace, body: F) -> Result<T, E>
    where
        E: From<LifecycleError>,
        F: FnOnce(SharedEnvironment) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let shared = self.prepare(requirement).await?;
        let provisioned = match self.deploy(&shared).await {
            Ok(()) => self.connect(&shared).await,
            Err(err) => Err(err),
        };
        if let Err(err) = provisioned {
            self.delete(&shared).await;
            return Err(err.into());
        }
        match body(shared.clone()).await {
            Ok(value) => {
                self.release(&shared).await;
                Ok(value)
            }
            Err(err) => {
                self.delete(&shared).await;
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for EnvironmentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentManager")
            .field("platform", &self.platform.type_name())
            .field("candidates", &self.candidates.len())
            .field("tracked", &self.tracked_count())
            .finish()
    }
}
