//! Runbook: declared environments, test case requirements and lifecycle settings.
//!
//! Runbooks are JSON. The `platform` section is kept as opaque JSON and is
//! interpreted by the platform crate that runs the runbook.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lifecycle::LifecycleConfig;
use crate::resolver::{candidate_name, resolve, MatchedEnvironment};
use crate::schema::EnvironmentSpace;

#[derive(Debug, thiserror::Error)]
pub enum RunbookError {
    #[error("cannot read runbook {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid runbook JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid runbook: {}", problems.join("; "))]
    Invalid { problems: Vec<String> },
}

pub type RunbookResult<T> = std::result::Result<T, RunbookError>;

/// A test case and the environment it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRequirement {
    pub name: String,
    #[serde(default)]
    pub requirement: EnvironmentSpace,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Runbook {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub environments: Vec<EnvironmentSpace>,
    #[serde(default)]
    pub cases: Vec<CaseRequirement>,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Value>,
}

/// How one case would be resolved against the runbook's environments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CasePlan {
    Matched {
        case: String,
        environment: MatchedEnvironment,
    },
    Unavailable {
        case: String,
        reasons: Vec<String>,
    },
}

impl CasePlan {
    pub fn case(&self) -> &str {
        match self {
            CasePlan::Matched { case, .. } | CasePlan::Unavailable { case, .. } => case,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, CasePlan::Matched { .. })
    }
}

impl Runbook {
    pub fn from_json_str(text: &str) -> RunbookResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> RunbookResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RunbookError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let runbook = Self::from_json_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            environments = runbook.environments.len(),
            cases = runbook.cases.len(),
            "runbook loaded"
        );
        Ok(runbook)
    }

    /// Structural checks that do not involve resolution.
    pub fn validate(&self) -> RunbookResult<()> {
        let mut problems = Vec::new();
        if self.environments.is_empty() {
            problems.push("no environments declared".to_string());
        }

        let mut names = BTreeSet::new();
        for (index, environment) in self.environments.iter().enumerate() {
            let name = candidate_name(environment, index);
            if !names.insert(name.clone()) {
                problems.push(format!("duplicate environment name {name}"));
            }
        }

        let mut cases = BTreeSet::new();
        for case in &self.cases {
            if case.name.trim().is_empty() {
                problems.push("case with empty name".to_string());
            } else if !cases.insert(case.name.as_str()) {
                problems.push(format!("duplicate case {}", case.name));
            }
        }

        if self.lifecycle.connect.timeout_ms == 0 {
            problems.push("lifecycle.connect.timeout_ms must be positive".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(RunbookError::Invalid { problems })
        }
    }

    /// Resolve every case against the declared environments, in case order.
    pub fn plan(&self) -> Vec<CasePlan> {
        self.cases
            .iter()
            .map(|case| match resolve(&case.requirement, &self.environments) {
                Ok(environment) => CasePlan::Matched {
                    case: case.name.clone(),
                    environment,
                },
                Err(err) => CasePlan::Unavailable {
                    case: case.name.clone(),
                    reasons: err.reasons().to_vec(),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNBOOK: &str = r#"{
        "name": "smoke",
        "environments": [
            {
                "name": "small",
                "nodes": [{ "core_count": { "counts": [2], "min": 2, "max": 2 } }]
            },
            {
                "name": "large",
                "nodes": [{ "core_count": { "counts": [16], "min": 16, "max": 16 } }]
            }
        ],
        "cases": [
            { "name": "boot" },
            { "name": "perf", "requirement": { "nodes": [{ "core_count": { "min": 8 } }] } },
            { "name": "huge", "requirement": { "nodes": [{ "core_count": { "min": 64 } }] } }
        ],
        "lifecycle": { "reuse_environments": true }
    }"#;

    #[test]
    fn test_parse_and_validate() {
        let runbook = Runbook::from_json_str(RUNBOOK).unwrap();
        assert_eq!(runbook.name, "smoke");
        assert!(runbook.lifecycle.reuse_environments);
        assert_eq!(runbook.lifecycle.connect.max_retries, 3);
        runbook.validate().unwrap();
    }

    #[test]
    fn test_plan_follows_declaration_order() {
        let runbook = Runbook::from_json_str(RUNBOOK).unwrap();
        let plan = runbook.plan();
        assert_eq!(plan.len(), 3);

        match &plan[0] {
            CasePlan::Matched { environment, .. } => assert_eq!(environment.name, "small"),
            other => panic!("unexpected plan: {other:?}"),
        }
        match &plan[1] {
            CasePlan::Matched { environment, .. } => assert_eq!(environment.name, "large"),
            other => panic!("unexpected plan: {other:?}"),
        }
        match &plan[2] {
            CasePlan::Unavailable { reasons, .. } => {
                assert!(reasons.iter().any(|r| r.starts_with("small: ")));
                assert!(reasons.iter().any(|r| r.starts_with("large: ")));
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let runbook = Runbook {
            cases: vec![
                CaseRequirement {
                    name: "a".into(),
                    requirement: EnvironmentSpace::default(),
                },
                CaseRequirement {
                    name: "a".into(),
                    requirement: EnvironmentSpace::default(),
                },
            ],
            ..Runbook::default()
        };
        match runbook.validate().unwrap_err() {
            RunbookError::Invalid { problems } => {
                assert_eq!(problems.len(), 2, "{problems:?}");
                assert!(problems.contains(&"duplicate case a".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_path_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Runbook::from_path(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, RunbookError::Io { .. }));
    }
}
