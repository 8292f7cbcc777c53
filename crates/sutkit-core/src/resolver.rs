//! Environment requirement resolver.
//!
//! Pure function over its inputs: no locks, no I/O, safe to call from any task.

use serde::{Deserialize, Serialize};

use crate::capability::CapabilityValue;
use crate::schema::{EnvironmentSpace, NodeSpace};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no environment available: {}", reasons.join("; "))]
    NoEnvironmentAvailable { reasons: Vec<String> },
}

impl ResolveError {
    pub fn reasons(&self) -> &[String] {
        match self {
            ResolveError::NoEnvironmentAvailable { reasons } => reasons,
        }
    }
}

pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// A candidate that satisfied the requirement, with the narrowed capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedEnvironment {
    /// Position of the winning candidate in the input slice.
    pub candidate_index: usize,
    pub name: String,
    /// Requirement ∩ candidate. One node per requirement node.
    pub space: EnvironmentSpace,
    /// Candidate node index per requirement node.
    pub node_assignment: Vec<usize>,
}

impl MatchedEnvironment {
    pub fn nodes(&self) -> &[NodeSpace] {
        &self.space.nodes
    }
}

/// Pick the first candidate, in declaration order, that satisfies `requirement`.
///
/// With no candidates the error carries no reasons. Otherwise every rejected
/// candidate contributes its reasons, prefixed by the candidate's name.
pub fn resolve(
    requirement: &EnvironmentSpace,
    candidates: &[EnvironmentSpace],
) -> ResolveResult<MatchedEnvironment> {
    let mut reasons = Vec::new();
    for (index, candidate) in candidates.iter().enumerate() {
        let name = candidate_name(candidate, index);
        match requirement.assign_nodes(candidate) {
            Ok(assignment) => match requirement.intersect(candidate) {
                Ok(space) => {
                    tracing::debug!(candidate = %name, index, "requirement matched");
                    return Ok(MatchedEnvironment {
                        candidate_index: index,
                        name,
                        space,
                        node_assignment: assignment.capability_index,
                    });
                }
                Err(err) => {
                    reasons.extend(err.reasons().iter().map(|r| format!("{name}: {r}")));
                }
            },
            Err(node_reasons) => {
                reasons.extend(node_reasons.into_iter().map(|r| format!("{name}: {r}")));
            }
        }
    }
    tracing::debug!(candidates = candidates.len(), "no candidate matched");
    Err(ResolveError::NoEnvironmentAvailable { reasons })
}

/// Name used in diagnostics: the declared name, or `candidate_<index>`.
pub fn candidate_name(candidate: &EnvironmentSpace, index: usize) -> String {
    candidate
        .name
        .clone()
        .unwrap_or_else(|| format!("candidate_{index}"))
}
