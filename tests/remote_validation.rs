mod common;

use anyhow::Result;

use common::{FakeApi, INSTANCE_TYPE_ID, NETWORK_ID};
use ovirt_installer::client::{Host, RemoteAffinityGroup, VnicProfile};
use ovirt_installer::field::{ErrorKind, FieldPath};
use ovirt_installer::platform::{apply_defaults, InstallConfig};
use ovirt_installer::validation::{
    validate_affinity_groups, validate_engine_version, validate_for_provisioning,
    validate_host_capacity, validate_instance_types, validate_vnic_profile,
};
use ovirt_installer::OvirtError;

const INSTALL_CONFIG: &str = r#"
metadata:
  name: demo
platform:
  ovirt:
    ovirt_cluster_id: 3d7d1a0e-8b33-4a1c-9cfd-0f0b6a7b1c11
    ovirt_storage_domain_id: 5b1c2f7e-1b2a-4c3d-8e9f-0a1b2c3d4e5f
    ovirt_network_name: ovirtmgmt
    vnicProfileID: 0000000a-000a-000a-000a-000000000398
    api_vip: 10.0.0.10
    dns_vip: 10.0.0.11
    ingress_vip: 10.0.0.12
controlPlane:
  name: master
  replicas: 3
compute:
  - name: worker
    replicas: 2
"#;

fn install_config() -> InstallConfig {
    let mut config = InstallConfig::from_yaml(INSTALL_CONFIG).unwrap();
    apply_defaults(&mut config);
    config
}

#[tokio::test]
async fn test_valid_config_passes() -> Result<()> {
    validate_for_provisioning(&FakeApi::single(), &install_config()).await?;
    Ok(())
}

#[tokio::test]
async fn test_too_few_hosts_for_enforcing_group() -> Result<()> {
    let mut api = FakeApi::single();
    api.hosts.truncate(2);

    let errors = validate_host_capacity(&api, &install_config()).await?;

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path.as_str(), "platform.ovirt.affinityGroups[0]");
    assert!(errors[0].to_string().contains("controlplane"));
    Ok(())
}

#[tokio::test]
async fn test_non_enforcing_group_ignores_capacity() -> Result<()> {
    let mut api = FakeApi::single();
    api.hosts.truncate(1);
    let mut config = install_config();
    if let Some(groups) = config.platform.ovirt.as_mut().and_then(|p| p.affinity_groups.as_mut()) {
        for group in groups {
            group.enforcing = false;
        }
    }

    let errors = validate_host_capacity(&api, &config).await?;

    assert!(errors.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_affinity_group_is_reported() -> Result<()> {
    let api = FakeApi::single();
    let mut config = install_config();
    config.compute[0]
        .platform
        .ovirt
        .as_mut()
        .unwrap()
        .affinity_groups_names
        .push("spread".to_string());

    let errors = validate_affinity_groups(&api, &config).await?;

    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].path.as_str(),
        "compute[0].platform.ovirt.affinityGroupsNames[1]"
    );
    assert!(matches!(errors[0].kind, ErrorKind::NotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn test_affinity_group_existing_on_engine() -> Result<()> {
    let mut api = FakeApi::single();
    api.affinity_groups.push(RemoteAffinityGroup {
        id: "ag-1".to_string(),
        name: "spread".to_string(),
        priority: 1.0,
        enforcing: false,
    });
    let mut config = install_config();
    config.compute[0]
        .platform
        .ovirt
        .as_mut()
        .unwrap()
        .affinity_groups_names
        .push("spread".to_string());

    assert!(validate_affinity_groups(&api, &config).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_missing_instance_type() -> Result<()> {
    let api = FakeApi {
        instance_types: Vec::new(),
        ..FakeApi::single()
    };
    let mut config = install_config();
    let pool = config.compute[0].platform.ovirt.as_mut().unwrap();
    pool.instance_type_id = INSTANCE_TYPE_ID.to_string();
    pool.cpu = None;
    pool.memory_mb = None;

    let errors = validate_instance_types(&api, &config).await?;

    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].path.as_str(),
        "compute[0].platform.ovirt.instanceTypeID"
    );
    Ok(())
}

#[tokio::test]
async fn test_vnic_profile_from_another_network() -> Result<()> {
    let api = FakeApi {
        vnic_profiles: vec![VnicProfile {
            id: "11111111-2222-3333-4444-555555555555".to_string(),
            name: "other".to_string(),
            network_id: NETWORK_ID.to_string(),
        }],
        ..FakeApi::single()
    };
    let config = install_config();

    let path = FieldPath::new("platform").child("ovirt");

    let errors = validate_vnic_profile(&api, config.ovirt()?, &path).await?;

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path.as_str(), "platform.ovirt.vnicProfileID");
    assert!(errors[0].detail.contains("other"));
    Ok(())
}

#[tokio::test]
async fn test_old_engine_is_rejected() {
    let api = FakeApi {
        version: "4.3.8.2-1.el7".to_string(),
        ..FakeApi::single()
    };

    let err = validate_engine_version(&api, "4.3.9.4").await.unwrap_err();

    assert!(matches!(err, OvirtError::Version(_)));
    assert!(err.to_string().contains("MAINTENANCE"));
}

#[tokio::test]
async fn test_provisioning_reports_all_field_errors() {
    let mut api = FakeApi::single();
    api.hosts = vec![Host {
        id: "host-1".to_string(),
        name: "host1.example.com".to_string(),
        status: "up".to_string(),
    }];
    api.vnic_profiles.clear();

    let err = validate_for_provisioning(&api, &install_config())
        .await
        .unwrap_err();

    match err {
        // vnic profile plus both enforcing groups
        OvirtError::Validation(errors) => assert_eq!(errors.errors().len(), 3),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_omitted_replicas_count_as_default() -> Result<()> {
    let mut api = FakeApi::single();
    api.hosts.truncate(1);
    let mut config = InstallConfig::from_yaml(
        &INSTALL_CONFIG
            .replace("  replicas: 3\n", "")
            .replace("    replicas: 2\n", ""),
    )?;
    apply_defaults(&mut config);

    let errors = validate_host_capacity(&api, &config).await?;

    // three control plane and three compute machines on one host
    assert_eq!(errors.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_hosts_that_are_not_up_do_not_count() -> Result<()> {
    let mut api = FakeApi::single();
    api.hosts[2].status = "maintenance".to_string();

    let errors = validate_host_capacity(&api, &install_config()).await?;

    assert_eq!(errors.len(), 1);
    assert!(errors[0].detail.contains("has 2 up"));
    Ok(())
}

#[tokio::test]
async fn test_missing_vnic_profile_with_single_candidate() -> Result<()> {
    let mut config = install_config();
    config.platform.ovirt.as_mut().unwrap().vnic_profile_id.clear();

    validate_for_provisioning(&FakeApi::single(), &config).await?;
    Ok(())
}

#[tokio::test]
async fn test_missing_vnic_profile_with_several_candidates() {
    let mut api = FakeApi::single();
    api.vnic_profiles.push(VnicProfile {
        id: "11111111-2222-3333-4444-555555555555".to_string(),
        name: "passthrough".to_string(),
        network_id: NETWORK_ID.to_string(),
    });
    let mut config = install_config();
    config.platform.ovirt.as_mut().unwrap().vnic_profile_id.clear();

    let err = validate_for_provisioning(&api, &config).await.unwrap_err();

    match err {
        OvirtError::Validation(errors) => {
            assert_eq!(errors.errors().len(), 1);
            assert_eq!(errors.errors()[0].path.as_str(), "platform.ovirt.vnicProfileID");
            assert!(matches!(errors.errors()[0].kind, ErrorKind::Required));
        }
        other => panic!("unexpected error: {}", other),
    }
}
