//! Runtime environment instances.

pub mod node;
pub mod status;

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::resolver::MatchedEnvironment;
use crate::schema::EnvironmentSpace;

pub use node::Node;
pub use status::EnvironmentStatus;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvironmentError {
    #[error("environment {environment}: invalid transition {from} -> {to}")]
    InvalidTransition {
        environment: String,
        from: EnvironmentStatus,
        to: EnvironmentStatus,
    },

    #[error("environment {environment}: cannot {operation} while {status}")]
    InvalidState {
        environment: String,
        operation: &'static str,
        status: EnvironmentStatus,
    },
}

pub type EnvironmentResult<T> = std::result::Result<T, EnvironmentError>;

/// A runtime instance built from a matched candidate.
#[derive(Debug)]
pub struct Environment {
    pub id: Uuid,
    pub name: String,
    /// Index of the candidate this was resolved from.
    pub candidate_index: usize,
    /// Resolved capability, one node per requirement node.
    pub space: EnvironmentSpace,
    pub nodes: Vec<Node>,
    status: EnvironmentStatus,
    dirty: bool,
    in_use: bool,
    information: BTreeMap<String, String>,
}

impl Environment {
    /// Build a `New` environment holding one node per resolved node space.
    pub fn from_match(matched: MatchedEnvironment) -> Self {
        let nodes = matched
            .space
            .nodes
            .iter()
            .enumerate()
            .map(|(index, space)| Node::new(index, space.clone()))
            .collect();
        Self {
            id: Uuid::new_v4(),
            name: matched.name,
            candidate_index: matched.candidate_index,
            space: matched.space,
            nodes,
            status: EnvironmentStatus::New,
            dirty: false,
            in_use: false,
            information: BTreeMap::new(),
        }
    }

    pub fn status(&self) -> EnvironmentStatus {
        self.status
    }

    pub fn set_status(&mut self, next: EnvironmentStatus) -> EnvironmentResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(EnvironmentError::InvalidTransition {
                environment: self.name.clone(),
                from: self.status,
                to: next,
            });
        }
        tracing::debug!(environment = %self.name, from = %self.status, to = %next, "status changed");
        self.status = next;
        Ok(())
    }

    /// Terminal transition that cannot fail. Used by cleanup paths.
    pub(crate) fn force_deleted(&mut self) {
        self.status = EnvironmentStatus::Deleted;
        self.in_use = false;
        for node in &mut self.nodes {
            node.clear_session();
            node.clear_features();
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flag the environment as unsafe to reuse. Sticky until deletion.
    pub fn mark_dirty(&mut self) -> EnvironmentResult<()> {
        if !self.status.is_deployed() {
            return Err(EnvironmentError::InvalidState {
                environment: self.name.clone(),
                operation: "mark dirty",
                status: self.status,
            });
        }
        self.dirty = true;
        Ok(())
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    pub(crate) fn set_in_use(&mut self, in_use: bool) {
        self.in_use = in_use;
    }

    pub fn information(&self) -> &BTreeMap<String, String> {
        &self.information
    }

    pub fn set_information(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.information.insert(key.into(), value.into());
    }

    /// Environment and node facts merged into one map, environment first.
    ///
    /// Node keys are prefixed with the node name, e.g. `node_0.kernel_version`.
    /// Perf messages read a node's own facts unprefixed from the node itself.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = self.information.clone();
        metadata.insert("environment_name".into(), self.name.clone());
        for node in &self.nodes {
            for (key, value) in &node.information {
                metadata.insert(format!("{}.{key}", node.name), value.clone());
            }
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CountSpace;
    use crate::schema::NodeSpace;

    fn environment() -> Environment {
        let space = EnvironmentSpace::named("pool-a")
            .with_node(NodeSpace::default().with_core_count(CountSpace::exact(4)))
            .with_node(NodeSpace::default());
        Environment::from_match(MatchedEnvironment {
            candidate_index: 0,
            name: "pool-a".into(),
            space,
            node_assignment: vec![0, 1],
        })
    }

    #[test]
    fn test_from_match_builds_new_environment() {
        let env = environment();
        assert_eq!(env.status(), EnvironmentStatus::New);
        assert_eq!(env.nodes.len(), 2);
        assert_eq!(env.nodes[1].name, "node_1");
        assert!(!env.is_dirty());
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let mut env = environment();
        let err = env.set_status(EnvironmentStatus::Connected).unwrap_err();
        assert!(matches!(err, EnvironmentError::InvalidTransition { .. }));
        assert_eq!(env.status(), EnvironmentStatus::New);
    }

    #[test]
    fn test_mark_dirty_requires_deployment() {
        let mut env = environment();
        assert!(env.mark_dirty().is_err());
        env.set_status(EnvironmentStatus::Prepared).unwrap();
        env.set_status(EnvironmentStatus::Deployed).unwrap();
        env.mark_dirty().unwrap();
        env.set_status(EnvironmentStatus::Connected).unwrap();
        assert!(env.is_dirty());
    }

    #[test]
    fn test_metadata_prefixes_node_keys() {
        let mut env = environment();
        env.set_information("platform", "baremetal");
        env.nodes[0]
            .information
            .insert("kernel_version".into(), "6.8.0".into());
        let metadata = env.metadata();
        assert_eq!(metadata["platform"], "baremetal");
        assert_eq!(metadata["environment_name"], "pool-a");
        assert_eq!(metadata["node_0.kernel_version"], "6.8.0");
    }
}
