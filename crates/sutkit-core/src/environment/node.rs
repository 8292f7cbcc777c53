use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::platform::{
    ConnectionInfo, ExecuteResult, FeatureError, FeatureHandle, FeatureResult, FeatureType,
    NetworkInterface, RemoteSession, Resize, SerialConsole, SessionError, SessionResult, StartStop,
};
use crate::schema::NodeSpace;

/// One machine of an environment.
pub struct Node {
    pub index: usize,
    pub name: String,
    /// Resolved capability. Fixed once the environment is deployed.
    pub capability: NodeSpace,
    pub connection: Option<ConnectionInfo>,
    /// Free-form facts reported by the platform (host version, VM size, kernel).
    pub information: BTreeMap<String, String>,
    features: BTreeMap<FeatureType, FeatureHandle>,
    session: Option<Arc<dyn RemoteSession>>,
}

impl Node {
    pub fn new(index: usize, capability: NodeSpace) -> Self {
        Self {
            index,
            name: format!("node_{index}"),
            capability,
            connection: None,
            information: BTreeMap::new(),
            features: BTreeMap::new(),
            session: None,
        }
    }

    pub fn attach_feature(&mut self, handle: FeatureHandle) {
        self.features.insert(handle.feature_type(), handle);
    }

    pub fn clear_features(&mut self) {
        self.features.clear();
    }

    pub fn feature(&self, feature: FeatureType) -> Option<&FeatureHandle> {
        self.features.get(&feature)
    }

    pub fn feature_types(&self) -> Vec<FeatureType> {
        self.features.keys().copied().collect()
    }

    fn unsupported(&self, feature: FeatureType) -> FeatureError {
        FeatureError::Unsupported {
            feature,
            node: self.name.clone(),
        }
    }

    pub fn resize(&self) -> FeatureResult<Arc<dyn Resize>> {
        match self.features.get(&FeatureType::Resize) {
            Some(FeatureHandle::Resize(f)) => Ok(f.clone()),
            _ => Err(self.unsupported(FeatureType::Resize)),
        }
    }

    pub fn start_stop(&self) -> FeatureResult<Arc<dyn StartStop>> {
        match self.features.get(&FeatureType::StartStop) {
            Some(FeatureHandle::StartStop(f)) => Ok(f.clone()),
            _ => Err(self.unsupported(FeatureType::StartStop)),
        }
    }

    pub fn serial_console(&self) -> FeatureResult<Arc<dyn SerialConsole>> {
        match self.features.get(&FeatureType::SerialConsole) {
            Some(FeatureHandle::SerialConsole(f)) => Ok(f.clone()),
            _ => Err(self.unsupported(FeatureType::SerialConsole)),
        }
    }

    pub fn network_interface(&self) -> FeatureResult<Arc<dyn NetworkInterface>> {
        match self.features.get(&FeatureType::NetworkInterface) {
            Some(FeatureHandle::NetworkInterface(f)) => Ok(f.clone()),
            _ => Err(self.unsupported(FeatureType::NetworkInterface)),
        }
    }

    pub fn set_session(&mut self, session: Arc<dyn RemoteSession>) {
        self.session = Some(session);
    }

    pub fn clear_session(&mut self) {
        self.session = None;
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<Arc<dyn RemoteSession>> {
        self.session.clone()
    }

    /// Run a command over the node's open session.
    pub async fn execute(&self, command: &str, sudo: bool, shell: bool) -> SessionResult<ExecuteResult> {
        let session = self.session.as_ref().ok_or_else(|| SessionError::Execute {
            command: command.to_string(),
            reason: format!("{} is not connected", self.name),
        })?;
        session.execute(command, sudo, shell).await
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("capability", &self.capability)
            .field("connection", &self.connection)
            .field("features", &self.feature_types())
            .field("connected", &self.is_connected())
            .finish()
    }
}
