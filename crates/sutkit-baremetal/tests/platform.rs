//! Bare-metal deployment driven through the lifecycle manager.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use sutkit_baremetal::ready_checker::{FileSingleChecker, ReadyChecker, SshChecker};
use sutkit_baremetal::{BareMetalError, BareMetalPlatform, FileSingleIpGetter, IpGetter};
use sutkit_core::environment::EnvironmentStatus;
use sutkit_core::fakes::{FakeConnector, FakeSession};
use sutkit_core::lifecycle::{EnvironmentManager, LifecycleConfig, LifecycleError};
use sutkit_core::platform::{ConnectionInfo, PlatformError};
use sutkit_core::schema::{EnvironmentSpace, NodeSpace};
use sutkit_core::{Node, Platform};

fn rack(ready_checker: Value, ip_getter: Option<Value>, clients: Value) -> Value {
    let mut cluster = json!({
        "type": "rackmanager",
        "connection": { "address": "10.1.0.2", "username": "admin", "password": "rm-secret" },
        "ready_checker": ready_checker,
        "client": clients,
    });
    if let Some(ip_getter) = ip_getter {
        cluster["ip_getter"] = ip_getter;
    }
    json!({ "cluster": [cluster] })
}

fn one_client(port: Option<u32>) -> Value {
    let mut client = json!({ "connection": { "address": "10.1.0.20", "username": "root" } });
    if let Some(port) = port {
        client["management_port"] = json!(port);
    }
    json!([client])
}

fn ssh_ready() -> Value {
    json!({ "type": "ssh", "timeout": 30 })
}

fn pool(nodes: usize) -> Vec<EnvironmentSpace> {
    let mut space = EnvironmentSpace::named("lab-rack");
    for _ in 0..nodes {
        space = space.with_node(NodeSpace::default());
    }
    vec![space]
}

fn manager(platform: Value, connector: Arc<FakeConnector>, nodes: usize) -> EnvironmentManager {
    let platform = BareMetalPlatform::from_runbook(Some(&platform), connector.clone()).unwrap();
    EnvironmentManager::new(
        Arc::new(platform),
        connector,
        pool(nodes),
        LifecycleConfig::default(),
    )
}

fn write(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
}

fn node_at(address: &str) -> Node {
    let mut node = Node::new(0, NodeSpace::default());
    node.connection = Some(ConnectionInfo::new(address, "root"));
    node
}

#[tokio::test]
async fn test_deploy_resets_clients_and_connects() {
    let dir = tempfile::tempdir().unwrap();
    let ip_file = dir.path().join("ip");
    write(&ip_file, "ipaddr=10.0.3.17\n");

    let session = Arc::new(FakeSession::new());
    let connector = Arc::new(FakeConnector::new().with_session(session.clone()));
    let manager = manager(
        rack(
            ssh_ready(),
            Some(json!({ "type": "file_single", "file": ip_file })),
            one_client(Some(7)),
        ),
        connector.clone(),
        1,
    );

    let env = manager.prepare(&EnvironmentSpace::default()).await.unwrap();
    manager.deploy(&env).await.unwrap();
    manager.connect(&env).await.unwrap();

    assert_eq!(session.commands(), vec!["set system reset -i 7".to_string()]);
    // rack manager, ssh ready check on the configured address, then the discovered address
    assert_eq!(
        connector.connected(),
        vec!["10.1.0.2:22", "10.1.0.20:22", "10.0.3.17:22"]
    );
    {
        let guard = env.lock().await;
        assert_eq!(guard.status(), EnvironmentStatus::Connected);
        assert_eq!(guard.information()["platform"], "baremetal");
        assert_eq!(guard.information()["cluster"], "rackmanager");
        assert_eq!(guard.nodes[0].name, "node_0");
        assert!(guard.nodes[0].start_stop().is_ok());
        assert!(guard.nodes[0].serial_console().is_ok());
        assert!(guard.nodes[0].resize().is_err());
    }

    manager.shutdown().await;
}

#[tokio::test]
async fn test_missing_management_port_fails_before_reset() {
    let connector = Arc::new(FakeConnector::new());
    let manager = manager(rack(ssh_ready(), None, one_client(None)), connector.clone(), 1);

    let env = manager.prepare(&EnvironmentSpace::default()).await.unwrap();
    let err = manager.deploy(&env).await.unwrap_err();

    assert!(err
        .to_string()
        .contains("management_port is required for rackmanager client 0"));
    assert_eq!(connector.attempts(), 0);
    assert_eq!(env.lock().await.status(), EnvironmentStatus::Prepared);
}

#[tokio::test]
async fn test_reset_failure_reports_command() {
    let session = Arc::new(FakeSession::new());
    session.respond("set system reset", 1, "port busy");
    let connector = Arc::new(FakeConnector::new().with_session(session));
    let manager = manager(rack(ssh_ready(), None, one_client(Some(7))), connector, 1);

    let env = manager.prepare(&EnvironmentSpace::default()).await.unwrap();
    let err = manager.deploy(&env).await.unwrap_err();

    match err {
        LifecycleError::Deployment {
            source: PlatformError::Deployment(reason),
            ..
        } => assert_eq!(reason, "`set system reset -i 7` exited with 1: port busy"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unreachable_rack_manager_is_session_error() {
    let connector = Arc::new(FakeConnector::new().unreachable());
    let manager = manager(rack(ssh_ready(), None, one_client(Some(7))), connector, 1);

    let env = manager.prepare(&EnvironmentSpace::default()).await.unwrap();
    let err = manager.deploy(&env).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Deployment {
            source: PlatformError::Session(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_not_enough_clients_is_capacity() {
    let connector = Arc::new(FakeConnector::new());
    let manager = manager(rack(ssh_ready(), None, one_client(Some(7))), connector, 2);

    let requirement = EnvironmentSpace::default()
        .with_node(NodeSpace::default())
        .with_node(NodeSpace::default());
    let env = manager.prepare(&requirement).await.unwrap();
    let err = manager.deploy(&env).await.unwrap_err();

    assert!(err.is_capacity(), "{err}");
    assert_eq!(env.lock().await.status(), EnvironmentStatus::New);
}

#[tokio::test]
async fn test_runbook_without_cluster_fails_deploy() {
    let connector = Arc::new(FakeConnector::new());
    let manager = manager(json!({}), connector, 1);

    let env = manager.prepare(&EnvironmentSpace::default()).await.unwrap();
    let err = manager.deploy(&env).await.unwrap_err();
    assert!(err
        .to_string()
        .contains("no cluster is specified in the runbook"));
}

#[tokio::test]
async fn test_unknown_cluster_type_fails_deploy() {
    let mut platform = rack(ssh_ready(), None, one_client(Some(7)));
    platform["cluster"][0]["type"] = json!("idrac");
    let manager = manager(platform, Arc::new(FakeConnector::new()), 1);

    let env = manager.prepare(&EnvironmentSpace::default()).await.unwrap();
    let err = manager.deploy(&env).await.unwrap_err();
    assert!(err.to_string().contains("unknown cluster type: idrac"));
}

#[test]
fn test_platform_advertises_no_op_features() {
    let platform =
        BareMetalPlatform::from_runbook(None, Arc::new(FakeConnector::new())).unwrap();
    assert_eq!(platform.type_name(), "baremetal");
    assert!(platform.config().cluster.is_empty());
    let features = platform.features().types();
    assert_eq!(features, platform.supported_features());
}

#[tokio::test(start_paused = true)]
async fn test_file_single_waits_for_marker() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ready");
    write(&marker, "stale");

    let checker = FileSingleChecker::new(&marker, Duration::from_secs(30));
    checker.clean_up().await.unwrap();
    assert!(!marker.exists());
    // cleaning twice is fine
    checker.clean_up().await.unwrap();

    let writer = {
        let marker = marker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            std::fs::write(&marker, "booted").unwrap();
        })
    };
    checker.is_ready(&node_at("10.1.0.20")).await.unwrap();
    writer.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_file_single_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let checker = FileSingleChecker::new(dir.path().join("never"), Duration::from_secs(3));

    let err = checker.is_ready(&node_at("10.1.0.20")).await.unwrap_err();
    assert!(matches!(
        err,
        BareMetalError::NotReady { ref node, timeout_secs: 3 } if node == "node_0"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_ssh_checker_retries_until_reachable() {
    let connector = Arc::new(FakeConnector::new().failing_first(3));
    let checker = SshChecker::new(connector.clone(), 60);

    checker.is_ready(&node_at("10.1.0.20")).await.unwrap();
    assert_eq!(connector.attempts(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_ssh_checker_times_out() {
    let checker = SshChecker::new(Arc::new(FakeConnector::new().unreachable()), 5);
    let err = checker.is_ready(&node_at("10.1.0.20")).await.unwrap_err();
    assert_eq!(err.to_string(), "node_0 is not ready after 5s");
}

#[tokio::test]
async fn test_ip_file_without_address() {
    let dir = tempfile::tempdir().unwrap();
    let ip_file = dir.path().join("ip");
    write(&ip_file, "dhcp pending\n");

    let getter = FileSingleIpGetter::new(&ip_file).unwrap();
    let err = getter.get_ip(&node_at("")).await.unwrap_err();
    assert!(matches!(err, BareMetalError::IpNotFound { .. }));
    assert!(err.to_string().starts_with("could not get ip from content of file"));
}
