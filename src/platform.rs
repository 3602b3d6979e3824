use log::debug;
use serde::{Deserialize, Serialize};

/// VM types the engine accepts for a machine pool.
pub const VM_TYPES: [&str; 3] = ["desktop", "server", "high_performance"];

pub const CONTROL_PLANE_AFFINITY_GROUP: &str = "controlplane";
pub const COMPUTE_AFFINITY_GROUP: &str = "compute";

/// Machines in a pool that does not set `replicas`.
pub const DEFAULT_REPLICAS: u32 = 3;

const DEFAULT_CORES: i32 = 4;
const DEFAULT_SOCKETS: i32 = 1;
const DEFAULT_MEMORY_MB: i64 = 16348;
const DEFAULT_OS_DISK_GB: i64 = 120;

/// The oVirt section of the install config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    #[serde(rename = "ovirt_cluster_id", default)]
    pub cluster_id: String,
    #[serde(rename = "ovirt_storage_domain_id", default)]
    pub storage_domain_id: String,
    #[serde(rename = "ovirt_network_name", default)]
    pub network_name: String,
    #[serde(rename = "vnicProfileID", default, skip_serializing_if = "String::is_empty")]
    pub vnic_profile_id: String,
    #[serde(default)]
    pub api_vip: String,
    #[serde(default)]
    pub dns_vip: String,
    #[serde(default)]
    pub ingress_vip: String,
    /// `None` means the installer declares its default groups.
    #[serde(rename = "affinityGroups", default, skip_serializing_if = "Option::is_none")]
    pub affinity_groups: Option<Vec<AffinityGroup>>,
    #[serde(rename = "defaultMachinePlatform", default, skip_serializing_if = "Option::is_none")]
    pub default_machine_platform: Option<MachinePool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityGroup {
    pub name: String,
    /// 1 (lowest) to 5 (highest).
    pub priority: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub enforcing: bool,
}

/// Per-pool VM shape.
///
/// `instance_type_id` excludes `cpu` and `memory_mb`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachinePool {
    #[serde(rename = "instanceTypeID", default, skip_serializing_if = "String::is_empty")]
    pub instance_type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Cpu>,
    #[serde(rename = "memoryMB", default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<i64>,
    #[serde(rename = "osDisk", default, skip_serializing_if = "Option::is_none")]
    pub os_disk: Option<Disk>,
    #[serde(rename = "vmType", default, skip_serializing_if = "String::is_empty")]
    pub vm_type: String,
    #[serde(rename = "affinityGroupsNames", default, skip_serializing_if = "Vec::is_empty")]
    pub affinity_groups_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    pub cores: i32,
    pub sockets: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    #[serde(rename = "sizeGB")]
    pub size_gb: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallConfig {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub platform: PlatformSection,
    #[serde(rename = "controlPlane", default, skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<MachinePoolSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compute: Vec<MachinePoolSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ovirt: Option<Platform>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachinePoolSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    #[serde(default)]
    pub platform: MachinePoolPlatform,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachinePoolPlatform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ovirt: Option<MachinePool>,
}

impl Platform {
    /// Declared affinity groups, or the defaults the installer creates.
    pub fn affinity_groups_or_default(&self) -> Vec<AffinityGroup> {
        self.affinity_groups
            .clone()
            .unwrap_or_else(default_affinity_groups)
    }
}

impl InstallConfig {
    pub fn from_yaml(content: &str) -> crate::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// The oVirt platform block, or a config error when the install config targets something else.
    pub fn ovirt(&self) -> crate::Result<&Platform> {
        self.platform.ovirt.as_ref().ok_or_else(|| {
            crate::OvirtError::Config(format!(
                "install config has no platform.{} section",
                crate::PLATFORM_NAME
            ))
        })
    }

    /// Control plane first, then compute pools.
    pub fn machine_pools(&self) -> impl Iterator<Item = &MachinePoolSpec> {
        self.control_plane.iter().chain(self.compute.iter())
    }
}

pub fn default_affinity_groups() -> Vec<AffinityGroup> {
    vec![
        AffinityGroup {
            name: CONTROL_PLANE_AFFINITY_GROUP.to_string(),
            priority: 5,
            description: "AffinityGroup for spreading each control plane machine to a different host"
                .to_string(),
            enforcing: true,
        },
        AffinityGroup {
            name: COMPUTE_AFFINITY_GROUP.to_string(),
            priority: 3,
            description: "AffinityGroup for spreading each compute machine to a different host"
                .to_string(),
            enforcing: true,
        },
    ]
}

fn default_machine_pool(vm_type: &str, affinity_group: &str) -> MachinePool {
    MachinePool {
        instance_type_id: String::new(),
        cpu: Some(Cpu {
            cores: DEFAULT_CORES,
            sockets: DEFAULT_SOCKETS,
        }),
        memory_mb: Some(DEFAULT_MEMORY_MB),
        os_disk: Some(Disk {
            size_gb: DEFAULT_OS_DISK_GB,
        }),
        vm_type: vm_type.to_string(),
        affinity_groups_names: vec![affinity_group.to_string()],
    }
}

/// Fill in what the user left out: affinity groups, replica counts and per-pool VM shapes.
///
/// Pools that inherit `defaultMachinePlatform` get a copy of it instead of the
/// built-in shape.
pub fn apply_defaults(config: &mut InstallConfig) {
    let Some(platform) = config.platform.ovirt.as_mut() else {
        return;
    };

    if platform.affinity_groups.is_none() {
        debug!("No affinity groups declared, using the defaults");
        platform.affinity_groups = Some(default_affinity_groups());
    }
    let inherited = platform.default_machine_platform.clone();

    if let Some(pool) = config.control_plane.as_mut() {
        pool.replicas.get_or_insert(DEFAULT_REPLICAS);
        if pool.platform.ovirt.is_none() {
            pool.platform.ovirt = Some(inherited.clone().unwrap_or_else(|| {
                default_machine_pool("high_performance", CONTROL_PLANE_AFFINITY_GROUP)
            }));
        }
    }

    for pool in config.compute.iter_mut() {
        pool.replicas.get_or_insert(DEFAULT_REPLICAS);
        if pool.platform.ovirt.is_none() {
            pool.platform.ovirt = Some(
                inherited
                    .clone()
                    .unwrap_or_else(|| default_machine_pool("server", COMPUTE_AFFINITY_GROUP)),
            );
        }
    }
}
