//! Composite capability schema: node and environment records.

pub mod environment;
pub mod feature_settings;
pub mod node;
pub mod types;

pub use environment::{EnvironmentSpace, NodeAssignment};
pub use feature_settings::{FeatureSettings, NetworkInterfaceSettings, SecurityProfileSettings};
pub use node::NodeSpace;
pub use types::{DiskType, NetworkDataPath, SecurityProfileType};
