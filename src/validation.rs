use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use crate::client::OvirtApi;
use crate::field::{FieldError, FieldPath, ValidationErrors};
use crate::platform::{InstallConfig, MachinePool, Platform, DEFAULT_REPLICAS, VM_TYPES};
use crate::version::{check_release_support, parse_release, MINIMUM_ENGINE_VERSION};
use crate::{OvirtError, Result, PLATFORM_NAME};

const MIN_AFFINITY_PRIORITY: i32 = 1;
const MAX_AFFINITY_PRIORITY: i32 = 5;

/// Host status that can run VMs.
const HOST_UP: &str = "up";

fn platform_path() -> FieldPath {
    FieldPath::new("platform").child(PLATFORM_NAME)
}

fn pool_path(index: Option<usize>) -> FieldPath {
    match index {
        None => FieldPath::new("controlPlane"),
        Some(i) => FieldPath::new("compute").index(i),
    }
    .child("platform")
    .child(PLATFORM_NAME)
}

fn check_uuid(value: &str, path: &FieldPath, errors: &mut Vec<FieldError>) {
    if let Err(err) = uuid::Uuid::parse_str(value) {
        errors.push(FieldError::invalid(path, value, format!("invalid UUID: {}", err)));
    }
}

fn check_ip(value: &str, path: &FieldPath, errors: &mut Vec<FieldError>) {
    if value.is_empty() {
        errors.push(FieldError::required(path, "an IP address is required"));
    } else if value.parse::<IpAddr>().is_err() {
        errors.push(FieldError::invalid(path, value, "not a valid IP address"));
    }
}

/// Structural checks on the platform block.
pub fn validate_platform(platform: &Platform, path: &FieldPath) -> Vec<FieldError> {
    let mut errors = Vec::new();

    check_uuid(&platform.cluster_id, &path.child("ovirt_cluster_id"), &mut errors);
    check_uuid(
        &platform.storage_domain_id,
        &path.child("ovirt_storage_domain_id"),
        &mut errors,
    );
    check_ip(&platform.api_vip, &path.child("api_vip"), &mut errors);
    check_ip(&platform.dns_vip, &path.child("dns_vip"), &mut errors);
    check_ip(&platform.ingress_vip, &path.child("ingress_vip"), &mut errors);

    if !platform.vnic_profile_id.is_empty() {
        check_uuid(&platform.vnic_profile_id, &path.child("vnicProfileID"), &mut errors);
    }

    if let Some(groups) = &platform.affinity_groups {
        let groups_path = path.child("affinityGroups");
        let mut seen = HashSet::new();
        for (i, group) in groups.iter().enumerate() {
            let group_path = groups_path.index(i);
            if group.name.is_empty() {
                errors.push(FieldError::required(&group_path.child("name"), ""));
            } else if !seen.insert(group.name.as_str()) {
                errors.push(FieldError::invalid(
                    &group_path.child("name"),
                    &group.name,
                    "duplicate affinity group name",
                ));
            }
            if !(MIN_AFFINITY_PRIORITY..=MAX_AFFINITY_PRIORITY).contains(&group.priority) {
                errors.push(FieldError::invalid(
                    &group_path.child("priority"),
                    group.priority,
                    format!(
                        "priority must be between {} and {}",
                        MIN_AFFINITY_PRIORITY, MAX_AFFINITY_PRIORITY
                    ),
                ));
            }
        }
    }

    if let Some(pool) = &platform.default_machine_platform {
        errors.extend(validate_machine_pool(pool, &path.child("defaultMachinePlatform")));
    }

    errors
}

/// Structural checks on one pool's oVirt block.
pub fn validate_machine_pool(pool: &MachinePool, path: &FieldPath) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if let Some(cpu) = &pool.cpu {
        if cpu.cores <= 0 {
            errors.push(FieldError::invalid(
                &path.child("cpu").child("cores"),
                cpu.cores,
                "cores must be positive",
            ));
        }
        if cpu.sockets <= 0 {
            errors.push(FieldError::invalid(
                &path.child("cpu").child("sockets"),
                cpu.sockets,
                "sockets must be positive",
            ));
        }
    }

    if let Some(memory) = pool.memory_mb {
        if memory <= 0 {
            errors.push(FieldError::invalid(
                &path.child("memoryMB"),
                memory,
                "memory must be positive",
            ));
        }
    }

    if !pool.vm_type.is_empty() && !VM_TYPES.contains(&pool.vm_type.as_str()) {
        errors.push(FieldError::not_supported(
            &path.child("vmType"),
            &pool.vm_type,
            &VM_TYPES,
        ));
    }

    if !pool.instance_type_id.is_empty() {
        let instance_path = path.child("instanceTypeID");
        check_uuid(&pool.instance_type_id, &instance_path, &mut errors);
        if pool.cpu.is_some() {
            errors.push(FieldError::forbidden(
                &instance_path,
                "instanceTypeID and cpu may not be set together",
            ));
        }
        if pool.memory_mb.is_some() {
            errors.push(FieldError::forbidden(
                &instance_path,
                "instanceTypeID and memoryMB may not be set together",
            ));
        }
    }

    if let Some(disk) = &pool.os_disk {
        if disk.size_gb <= 0 {
            errors.push(FieldError::invalid(
                &path.child("osDisk").child("sizeGB"),
                disk.size_gb,
                "disk size must be positive",
            ));
        }
    }

    errors
}

/// Offline validation of the whole install config.
pub fn validate_install_config(config: &InstallConfig) -> Result<()> {
    let mut errors = validate_platform(config.ovirt()?, &platform_path());

    if let Some(pool) = config.control_plane.as_ref().and_then(|p| p.platform.ovirt.as_ref()) {
        errors.extend(validate_machine_pool(pool, &pool_path(None)));
    }
    for (i, spec) in config.compute.iter().enumerate() {
        if let Some(pool) = &spec.platform.ovirt {
            errors.extend(validate_machine_pool(pool, &pool_path(Some(i))));
        }
    }

    debug!("Offline validation found {} problem(s)", errors.len());
    Ok(ValidationErrors::check(errors)?)
}

/// The VNIC profile must belong to the selected network of the selected cluster.
/// Without one, the network must have exactly one profile to fall back on.
pub async fn validate_vnic_profile(
    api: &dyn OvirtApi,
    platform: &Platform,
    path: &FieldPath,
) -> Result<Vec<FieldError>> {
    let mut errors = Vec::new();

    let networks = api
        .list_networks(&platform.cluster_id)
        .await
        .map_err(|e| OvirtError::remote("failed to list networks", e))?;
    let Some(network) = networks.iter().find(|n| n.name == platform.network_name) else {
        errors.push(FieldError::not_found(
            &path.child("ovirt_network_name"),
            &platform.network_name,
            "network is not attached to the cluster",
        ));
        return Ok(errors);
    };

    let profiles = api
        .list_vnic_profiles(&network.id)
        .await
        .map_err(|e| OvirtError::remote("failed to list VNIC profiles", e))?;

    if platform.vnic_profile_id.is_empty() {
        match profiles.as_slice() {
            [only] => debug!("No VNIC profile set, network {} has only {}", network.name, only.id),
            _ => errors.push(FieldError::required(
                &path.child("vnicProfileID"),
                format!(
                    "network {} has {} VNIC profiles, one must be chosen",
                    network.name,
                    profiles.len()
                ),
            )),
        }
    } else if !profiles.iter().any(|p| p.id == platform.vnic_profile_id) {
        let available: Vec<String> = profiles
            .iter()
            .map(|p| format!("{} ({})", p.name, p.id))
            .collect();
        errors.push(FieldError::invalid(
            &path.child("vnicProfileID"),
            &platform.vnic_profile_id,
            format!(
                "profile does not belong to network {}; available: {}",
                network.name,
                available.join(", ")
            ),
        ));
    }

    Ok(errors)
}

/// Affinity group names referenced by pools must exist on the engine or be
/// declared in the install config.
pub async fn validate_affinity_groups(
    api: &dyn OvirtApi,
    config: &InstallConfig,
) -> Result<Vec<FieldError>> {
    let platform = config.ovirt()?;
    let remote = api
        .list_affinity_groups(&platform.cluster_id)
        .await
        .map_err(|e| OvirtError::remote("failed to list affinity groups", e))?;

    let known: HashSet<String> = remote
        .into_iter()
        .map(|g| g.name)
        .chain(platform.affinity_groups_or_default().into_iter().map(|g| g.name))
        .collect();

    let mut errors = Vec::new();
    let mut check = |pool: &MachinePool, path: FieldPath| {
        for (i, name) in pool.affinity_groups_names.iter().enumerate() {
            if !known.contains(name) {
                errors.push(FieldError::not_found(
                    &path.child("affinityGroupsNames").index(i),
                    name,
                    "affinity group neither exists in the cluster nor is declared",
                ));
            }
        }
    };

    if let Some(pool) = &platform.default_machine_platform {
        check(pool, platform_path().child("defaultMachinePlatform"));
    }
    if let Some(pool) = config.control_plane.as_ref().and_then(|p| p.platform.ovirt.as_ref()) {
        check(pool, pool_path(None));
    }
    for (i, spec) in config.compute.iter().enumerate() {
        if let Some(pool) = &spec.platform.ovirt {
            check(pool, pool_path(Some(i)));
        }
    }

    Ok(errors)
}

/// Every enforcing affinity group needs one host per machine placed in it.
pub async fn validate_host_capacity(
    api: &dyn OvirtApi,
    config: &InstallConfig,
) -> Result<Vec<FieldError>> {
    let platform = config.ovirt()?;
    let cluster = api
        .get_cluster(&platform.cluster_id)
        .await
        .map_err(|e| OvirtError::remote("failed to get cluster", e))?;
    let hosts: Vec<_> = api
        .list_hosts(&cluster.name)
        .await
        .map_err(|e| OvirtError::remote("failed to list hosts", e))?
        .into_iter()
        .filter(|h| h.status == HOST_UP)
        .collect();
    let remote = api
        .list_affinity_groups(&cluster.id)
        .await
        .map_err(|e| OvirtError::remote("failed to list affinity groups", e))?;

    let mut enforcing: HashMap<String, bool> =
        remote.into_iter().map(|g| (g.name, g.enforcing)).collect();
    let declared = platform.affinity_groups_or_default();
    for group in &declared {
        enforcing.insert(group.name.clone(), group.enforcing);
    }

    let mut replicas: HashMap<&str, u32> = HashMap::new();
    for spec in config.machine_pools() {
        let Some(pool) = &spec.platform.ovirt else { continue };
        for name in &pool.affinity_groups_names {
            *replicas.entry(name.as_str()).or_insert(0) += spec.replicas.unwrap_or(DEFAULT_REPLICAS);
        }
    }

    let mut errors = Vec::new();
    let mut names: Vec<_> = replicas.into_iter().collect();
    names.sort();
    for (name, count) in names {
        if !enforcing.get(name).copied().unwrap_or(false) || (count as usize) <= hosts.len() {
            continue;
        }
        let path = match declared.iter().position(|g| g.name == name) {
            Some(i) if platform.affinity_groups.is_some() => {
                platform_path().child("affinityGroups").index(i)
            }
            _ => platform_path().child("affinityGroups"),
        };
        errors.push(FieldError::invalid(
            &path,
            name,
            format!(
                "enforcing affinity group needs {} hosts but cluster {} has {} up",
                count,
                cluster.name,
                hosts.len()
            ),
        ));
    }

    Ok(errors)
}

/// Every referenced instance type must exist.
pub async fn validate_instance_types(
    api: &dyn OvirtApi,
    config: &InstallConfig,
) -> Result<Vec<FieldError>> {
    let platform = config.ovirt()?;
    let mut pools: Vec<(&MachinePool, FieldPath)> = Vec::new();
    if let Some(pool) = &platform.default_machine_platform {
        pools.push((pool, platform_path().child("defaultMachinePlatform")));
    }
    if let Some(pool) = config.control_plane.as_ref().and_then(|p| p.platform.ovirt.as_ref()) {
        pools.push((pool, pool_path(None)));
    }
    for (i, spec) in config.compute.iter().enumerate() {
        if let Some(pool) = &spec.platform.ovirt {
            pools.push((pool, pool_path(Some(i))));
        }
    }

    let mut errors = Vec::new();
    for (pool, path) in pools {
        if pool.instance_type_id.is_empty() {
            continue;
        }
        match api.get_instance_type(&pool.instance_type_id).await {
            Ok(instance_type) => debug!(
                "Instance type {} resolves to {}",
                instance_type.id, instance_type.name
            ),
            Err(OvirtError::NotFound(_)) => errors.push(FieldError::not_found(
                &path.child("instanceTypeID"),
                &pool.instance_type_id,
                "instance type does not exist",
            )),
            Err(e) => return Err(OvirtError::remote("failed to get instance type", e)),
        }
    }

    Ok(errors)
}

/// The engine must be at least `minimum`.
pub async fn validate_engine_version(api: &dyn OvirtApi, minimum: &str) -> Result<()> {
    let current = api
        .engine_version()
        .await
        .map_err(|e| OvirtError::remote("failed to read engine version", e))?;
    info!("Engine version {}", current);

    let required = parse_release(minimum)?;
    check_release_support(&parse_release(&current)?, &required)?;
    Ok(())
}

/// Validation against the live engine; all field problems are reported together.
pub async fn validate_for_provisioning(api: &dyn OvirtApi, config: &InstallConfig) -> Result<()> {
    validate_engine_version(api, MINIMUM_ENGINE_VERSION).await?;

    let platform = config.ovirt()?;
    let mut errors = validate_vnic_profile(api, platform, &platform_path()).await?;
    errors.extend(validate_affinity_groups(api, config).await?);
    errors.extend(validate_host_capacity(api, config).await?);
    errors.extend(validate_instance_types(api, config).await?);

    Ok(ValidationErrors::check(errors)?)
}
