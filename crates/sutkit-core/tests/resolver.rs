//! Resolution of JSON-declared requirements against JSON-declared candidates.

use sutkit_core::resolver::{resolve, ResolveError};
use sutkit_core::schema::{EnvironmentSpace, NetworkDataPath, SecurityProfileType};
use sutkit_core::FeatureType;

fn space(json: &str) -> EnvironmentSpace {
    serde_json::from_str(json).unwrap()
}

fn candidates() -> Vec<EnvironmentSpace> {
    vec![
        space(
            r#"{
                "name": "standard",
                "nodes": [{
                    "core_count": { "min": 2, "max": 8 },
                    "memory_mb": { "min": 4096, "max": 16384 },
                    "network_data_path": { "items": ["Synthetic"] }
                }]
            }"#,
        ),
        space(
            r#"{
                "name": "accelerated",
                "nodes": [
                    {
                        "core_count": { "counts": [16, 32] },
                        "memory_mb": { "min": 65536, "max": 131072, "choose_max": true },
                        "network_data_path": { "items": ["Synthetic", "Sriov"] },
                        "features": {
                            "SecurityProfile": {
                                "kind": "security_profile",
                                "profile": { "items": ["Standard", "CVM"] },
                                "encrypt_disk": true
                            }
                        }
                    },
                    {
                        "core_count": { "counts": [16, 32] },
                        "memory_mb": { "min": 65536, "max": 131072 },
                        "network_data_path": { "items": ["Synthetic", "Sriov"] }
                    }
                ]
            }"#,
        ),
    ]
}

#[test]
fn test_small_requirement_lands_on_first_candidate() {
    let requirement = space(r#"{ "nodes": [{ "core_count": { "min": 4 } }] }"#);
    let matched = resolve(&requirement, &candidates()).unwrap();
    assert_eq!(matched.name, "standard");
    assert_eq!(matched.nodes()[0].core_count.as_ref().unwrap().current, Some(4));
    // dimensions the requirement left open come from the candidate
    assert_eq!(
        matched.nodes()[0].current_data_path(),
        Some(NetworkDataPath::Synthetic)
    );
}

#[test]
fn test_sriov_chosen_when_offered() {
    let requirement = space(
        r#"{ "nodes": [{
            "network_data_path": { "items": ["Synthetic", "Sriov"] },
            "core_count": { "min": 16 },
            "memory_mb": { "min": 32768 }
        }] }"#,
    );
    let matched = resolve(&requirement, &candidates()).unwrap();
    assert_eq!(matched.name, "accelerated");
    assert_eq!(matched.nodes()[0].current_data_path(), Some(NetworkDataPath::Sriov));
    let memory = matched.nodes()[0].memory_mb.unwrap();
    assert_eq!(memory.current, Some(131072));
}

#[test]
fn test_feature_requirement_picks_matching_node() {
    let name = FeatureType::SecurityProfile.name();
    let requirement = space(&format!(
        r#"{{ "nodes": [
            {{ "features": {{ "{name}": {{ "kind": "security_profile", "profile": {{ "items": ["CVM"] }} }} }} }},
            {{ "core_count": {{ "min": 2 }} }}
        ] }}"#
    ));
    let matched = resolve(&requirement, &candidates()).unwrap();
    assert_eq!(matched.name, "accelerated");
    assert_eq!(matched.node_assignment, vec![0, 1]);
    let profile = match &matched.nodes()[0].features[name] {
        sutkit_core::schema::FeatureSettings::SecurityProfile(settings) => settings.clone(),
        other => panic!("unexpected settings: {other:?}"),
    };
    assert_eq!(profile.profile.unwrap().current, Some(SecurityProfileType::Cvm));
}

#[test]
fn test_no_candidate_explains_every_rejection() {
    let requirement = space(r#"{ "nodes": [{ "core_count": { "counts": [64] } }] }"#);
    let err = resolve(&requirement, &candidates()).unwrap_err();
    let ResolveError::NoEnvironmentAvailable { reasons } = &err;
    assert!(reasons.iter().any(|r| r.starts_with("standard: node[0] vs node[0]: core_count")));
    assert!(reasons.iter().any(|r| r.starts_with("accelerated: node[0] vs node[1]: core_count")));
    assert!(err.to_string().starts_with("no environment available: "));
}
