//! Structured messages sent to notifiers.
//!
//! Field names are wire identifiers consumed by reporting tools. Every field
//! is always serialized, including empty ones.

pub mod builder;
pub mod perf;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::TestStatus;

pub use builder::{
    apply_fields, create_perf_message, send_perf_message, send_sub_test_result_message,
    FieldPolicy, MessageError, MessageResult,
};
pub use perf::{
    CpuPerformance, DiskPerformance, DiskSetupType, NetworkLatencyPerformance,
    NetworkTcpPerformance, NetworkUdpPerformance, PerfDetail, PerfDiskType, PerfMessage,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    TestRun(TestRunMessage),
    TestResult(TestResultMessage),
    SubTestResult(SubTestMessage),
    Performance(PerfMessage),
    ProvisionBootTime(ProvisionBootTimeMessage),
    KernelBuild(KernelBuildMessage),
}

impl Message {
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::TestRun(_) => "TestRun",
            Message::TestResult(_) => "TestResult",
            Message::SubTestResult(_) => "SubTestResult",
            Message::Performance(_) => "Performance",
            Message::ProvisionBootTime(_) => "ProvisionBootTime",
            Message::KernelBuild(_) => "KernelBuild",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestRunStatus {
    Initializing,
    Running,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRunMessage {
    pub time: DateTime<Utc>,
    pub elapsed: f64,
    pub status: TestRunStatus,
    pub runbook_name: String,
    pub test_project: String,
    pub test_pass: String,
    pub tags: Option<Vec<String>>,
    pub run_name: String,
    pub message: String,
}

impl TestRunMessage {
    pub fn new(run_name: impl Into<String>, status: TestRunStatus) -> Self {
        Self {
            time: Utc::now(),
            elapsed: 0.0,
            status,
            runbook_name: String::new(),
            test_project: String::new(),
            test_pass: String::new(),
            tags: None,
            run_name: run_name.into(),
            message: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultMessage {
    pub time: DateTime<Utc>,
    pub elapsed: f64,
    #[serde(rename = "id_")]
    pub id: String,
    pub name: String,
    pub status: TestStatus,
    pub message: String,
    pub stacktrace: Option<String>,
    pub information: BTreeMap<String, String>,
    pub full_name: String,
    pub suite_name: String,
    pub suite_full_name: String,
    pub log_file: String,
}

impl TestResultMessage {
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

/// A result reported from inside a larger case, e.g. one benchmark of a suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTestMessage {
    pub time: DateTime<Utc>,
    pub elapsed: f64,
    #[serde(rename = "id_")]
    pub id: String,
    pub name: String,
    pub status: TestStatus,
    pub message: String,
    pub stacktrace: Option<String>,
    pub information: BTreeMap<String, String>,
    pub hardware_platform: String,
    pub parent_test: String,
}

impl SubTestMessage {
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: TestStatus) -> Self {
        Self {
            time: Utc::now(),
            elapsed: 0.0,
            id: id.into(),
            name: name.into(),
            status,
            message: String::new(),
            stacktrace: None,
            information: BTreeMap::new(),
            hardware_platform: String::new(),
            parent_test: String::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionBootTimeMessage {
    pub time: DateTime<Utc>,
    pub elapsed: f64,
    /// Number of boots found in `last reboot` entries.
    pub boot_times: u32,
    pub provision_time: f64,
    pub kernel_boot_time: f64,
    pub initrd_boot_time: f64,
    pub userspace_boot_time: f64,
    pub firmware_boot_time: f64,
    pub loader_boot_time: f64,
    pub information: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelBuildMessage {
    pub time: DateTime<Utc>,
    pub elapsed: f64,
    pub old_kernel_version: String,
    pub new_kernel_version: String,
    pub is_success: bool,
    pub error_message: String,
}
