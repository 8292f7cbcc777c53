//! sutkit core: capability matching and environment lifecycle for
//! system-under-test orchestration.
//!
//! A test case declares what it needs as an [`EnvironmentSpace`]; the
//! [`resolve`] function matches it against the environments a runbook
//! declares; the [`EnvironmentManager`] deploys, connects and deletes the
//! result through a [`Platform`] backend; results and measurements are
//! reported as [`Message`]s through a [`Notifier`].

pub mod capability;
pub mod environment;
pub mod fakes;
pub mod lifecycle;
pub mod messages;
pub mod metrics;
pub mod notifier;
pub mod obs;
pub mod platform;
pub mod resolver;
pub mod result;
pub mod runbook;
pub mod runner;
pub mod schema;
pub mod secret;
pub mod telemetry;

pub use capability::{
    CapabilityError, CapabilityResult, CapabilityValue, CheckResult, CountSpace, FixedValue,
    RangeValue, SetValue,
};
pub use environment::{Environment, EnvironmentError, EnvironmentStatus, Node};
pub use lifecycle::{
    EnvironmentManager, LifecycleConfig, LifecycleError, LifecycleResult, SharedEnvironment,
};
pub use messages::{Message, MessageError};
pub use notifier::{Notifier, NotifierSet};
pub use platform::{Connector, FeatureType, Platform, PlatformError, RemoteSession};
pub use resolver::{resolve, MatchedEnvironment, ResolveError};
pub use result::{Outcome, TestResult, TestStatus};
pub use runbook::{CasePlan, CaseRequirement, Runbook, RunbookError};
pub use runner::CaseRunner;
pub use schema::{EnvironmentSpace, NodeSpace};
pub use secret::Secret;
