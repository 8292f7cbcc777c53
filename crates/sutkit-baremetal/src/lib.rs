//! Bare-metal platform for sutkit.
//!
//! Physical clients sit behind a cluster controller (a rack manager). Deploying
//! an environment resets the clients, waits for them to boot through a ready
//! checker and reads back their addresses through an IP getter. Each of those
//! three pieces is picked by a `type` tag in the runbook's `platform` section.
//!
//! ```json
//! {
//!   "cluster": [{
//!     "type": "rackmanager",
//!     "connection": { "address": "10.1.0.2", "username": "admin", "password": "..." },
//!     "ready_checker": { "type": "file_single", "file": "/mnt/share/ready", "timeout": 600 },
//!     "ip_getter": { "type": "file_single", "file": "/mnt/share/ip" },
//!     "client": [{ "management_port": 7, "connection": { "address": "", "username": "root" } }]
//!   }]
//! }
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod features;
pub mod ip_getter;
pub mod platform;
pub mod ready_checker;
pub mod registry;

pub use cluster::{Cluster, RackManager};
pub use config::{BareMetalPlatformConfig, ClientConfig, ClusterConfig};
pub use error::{BareMetalError, BareMetalResult};
pub use ip_getter::{FileSingleIpGetter, IpGetter};
pub use platform::BareMetalPlatform;
pub use ready_checker::{FileSingleChecker, ReadyChecker, SshChecker};
pub use registry::Registry;
