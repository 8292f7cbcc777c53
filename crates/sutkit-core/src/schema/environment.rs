use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::feature_settings::FeatureSettings;
use super::node::{check_features, digest_json, intersect_features, NodeSpace};
use crate::capability::{CapabilityError, CapabilityResult, CapabilityValue, CheckResult};

/// A multi-node topology plus environment-level features.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentSpace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeSpace>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, FeatureSettings>,
}

/// Result of assigning requirement nodes to capability nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAssignment {
    /// Narrowed capability per requirement node, in requirement order.
    pub nodes: Vec<NodeSpace>,
    /// `capability_index[i]` is the capability node that requirement node `i` landed on.
    pub capability_index: Vec<usize>,
}

impl EnvironmentSpace {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_node(mut self, node: NodeSpace) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_feature(mut self, name: impl Into<String>, settings: FeatureSettings) -> Self {
        self.features.insert(name.into(), settings);
        self
    }

    /// Requirement nodes, treating an empty topology as one wildcard node.
    fn required_nodes(&self) -> Vec<NodeSpace> {
        if self.nodes.is_empty() {
            vec![NodeSpace::default()]
        } else {
            self.nodes.clone()
        }
    }

    /// Greedy first-fit: each requirement node, in declaration order, takes the
    /// first unused capability node it is compatible with.
    ///
    /// This is not a general bipartite matching. A topology that another
    /// assignment order would satisfy can still be rejected.
    pub fn assign_nodes(&self, capability: &EnvironmentSpace) -> Result<NodeAssignment, Vec<String>> {
        let required = self.required_nodes();
        if capability.nodes.len() < required.len() {
            return Err(vec![format!(
                "node count: requires {} node(s), capability has {}",
                required.len(),
                capability.nodes.len()
            )]);
        }

        let mut used = vec![false; capability.nodes.len()];
        let mut assignment = NodeAssignment {
            nodes: Vec::with_capacity(required.len()),
            capability_index: Vec::with_capacity(required.len()),
        };
        for (req_index, req) in required.iter().enumerate() {
            let mut reasons = Vec::new();
            let mut found = None;
            for (cap_index, cap) in capability.nodes.iter().enumerate() {
                if used[cap_index] {
                    continue;
                }
                match req.intersect(cap) {
                    Ok(narrowed) => {
                        found = Some((cap_index, narrowed));
                        break;
                    }
                    Err(_) => {
                        for reason in req.check(cap).reasons {
                            reasons.push(format!("node[{req_index}] vs node[{cap_index}]: {reason}"));
                        }
                    }
                }
            }
            match found {
                Some((cap_index, narrowed)) => {
                    used[cap_index] = true;
                    assignment.capability_index.push(cap_index);
                    assignment.nodes.push(narrowed);
                }
                None => {
                    if reasons.is_empty() {
                        reasons.push(format!(
                            "node[{req_index}]: every compatible node is already assigned"
                        ));
                    }
                    return Err(reasons);
                }
            }
        }
        Ok(assignment)
    }

    pub fn digest(&self) -> serde_json::Result<String> {
        digest_json(self)
    }
}

impl CapabilityValue for EnvironmentSpace {
    fn check(&self, capability: &Self) -> CheckResult {
        let mut result = CheckResult::ok();
        if let Err(reasons) = self.assign_nodes(capability) {
            result.reasons.extend(reasons);
        }
        result.merge(check_features(&self.features, &capability.features), "features");
        result
    }

    /// Resulting nodes follow the requirement's order; extra capability nodes are dropped.
    fn intersect(&self, capability: &Self) -> CapabilityResult<Self> {
        let assignment = self
            .assign_nodes(capability)
            .map_err(|reasons| CapabilityError::Incompatible { reasons })?;
        let features = intersect_features(&self.features, &capability.features)
            .map_err(|e| e.within("features"))?;
        Ok(EnvironmentSpace {
            name: capability.name.clone().or_else(|| self.name.clone()),
            nodes: assignment.nodes,
            features,
        })
    }
}
