//! Interactive selection of engine resources.
//!
//! Every picker lists candidates, refuses an empty list, asks for one by name
//! and writes the resolved identifier into the [`Platform`] being built.

use log::{debug, info};

use crate::client::{Cluster, Network, OvirtApi, Template};
use crate::platform::Platform;
use crate::prompt::Prompter;
use crate::{OvirtError, Result};

/// Storage domain type that can hold VM disks.
const DATA_DOMAIN: &str = "data";
const ACTIVE_DOMAIN: &str = "active";

/// Ask the user which of `candidates` they want; returns the matching element.
fn choose<'a, T>(
    prompter: &dyn Prompter,
    prompt: &str,
    help: &str,
    candidates: &'a [T],
    name: impl Fn(&T) -> &str,
) -> Result<&'a T> {
    let names: Vec<String> = candidates.iter().map(|c| name(c).to_string()).collect();
    let answer = prompter.select(prompt, help, &names)?;

    candidates
        .iter()
        .find(|c| name(c) == answer)
        .ok_or_else(|| OvirtError::Config(format!("{:?} is not one of the offered choices", answer)))
}

pub async fn ask_cluster(
    api: &dyn OvirtApi,
    prompter: &dyn Prompter,
    platform: &mut Platform,
) -> Result<Cluster> {
    let clusters = api
        .list_clusters()
        .await
        .map_err(|e| OvirtError::remote("failed to list clusters", e))?;
    if clusters.is_empty() {
        return Err(OvirtError::NotFound(
            "no clusters are visible to this user".to_string(),
        ));
    }

    let cluster = choose(
        prompter,
        "Cluster",
        "The cluster where the VMs will be created.",
        &clusters,
        |c| c.name.as_str(),
    )?
    .clone();

    info!("Using cluster {} ({})", cluster.name, cluster.id);
    platform.cluster_id = cluster.id.clone();
    Ok(cluster)
}

pub async fn ask_storage_domain(
    api: &dyn OvirtApi,
    prompter: &dyn Prompter,
    cluster: &Cluster,
    platform: &mut Platform,
) -> Result<()> {
    let domains: Vec<_> = api
        .list_storage_domains(&cluster.data_center_id)
        .await
        .map_err(|e| OvirtError::remote("failed to list storage domains", e))?
        .into_iter()
        .filter(|d| d.kind == DATA_DOMAIN && d.status == ACTIVE_DOMAIN)
        .collect();
    if domains.is_empty() {
        return Err(OvirtError::NotFound(format!(
            "no active data storage domains are attached to the data center of cluster {}",
            cluster.name
        )));
    }

    let domain = choose(
        prompter,
        "Storage domain",
        "The storage domain that will hold the VM disks.",
        &domains,
        |d| d.name.as_str(),
    )?;

    info!("Using storage domain {} ({})", domain.name, domain.id);
    platform.storage_domain_id = domain.id.clone();
    Ok(())
}

pub async fn ask_network(
    api: &dyn OvirtApi,
    prompter: &dyn Prompter,
    cluster: &Cluster,
    platform: &mut Platform,
) -> Result<Network> {
    let networks = api
        .list_networks(&cluster.id)
        .await
        .map_err(|e| OvirtError::remote("failed to list networks", e))?;
    if networks.is_empty() {
        return Err(OvirtError::NotFound(format!(
            "no networks are attached to cluster {}",
            cluster.name
        )));
    }

    let network = choose(
        prompter,
        "Network",
        "The network the VMs will be attached to.",
        &networks,
        |n| n.name.as_str(),
    )?
    .clone();

    info!("Using network {}", network.name);
    platform.network_name = network.name.clone();
    Ok(network)
}

/// A single profile is taken without asking.
pub async fn ask_vnic_profile(
    api: &dyn OvirtApi,
    prompter: &dyn Prompter,
    network: &Network,
    platform: &mut Platform,
) -> Result<()> {
    let profiles = api
        .list_vnic_profiles(&network.id)
        .await
        .map_err(|e| OvirtError::remote("failed to list VNIC profiles", e))?;

    let profile = match profiles.as_slice() {
        [] => {
            return Err(OvirtError::NotFound(format!(
                "no VNIC profiles exist for network {}",
                network.name
            )))
        }
        [only] => {
            debug!("Network {} has a single VNIC profile, selecting it", network.name);
            only
        }
        _ => choose(
            prompter,
            "VNIC profile",
            "The VNIC profile for the VMs' network interfaces.",
            &profiles,
            |p| p.name.as_str(),
        )?,
    };

    info!("Using VNIC profile {} ({})", profile.name, profile.id);
    platform.vnic_profile_id = profile.id.clone();
    Ok(())
}

/// Fill in a missing VNIC profile without asking, from the only profile of the
/// platform's network. Several profiles (or none) is an error.
pub async fn resolve_vnic_profile(api: &dyn OvirtApi, platform: &mut Platform) -> Result<()> {
    if !platform.vnic_profile_id.is_empty() {
        return Ok(());
    }

    let networks = api
        .list_networks(&platform.cluster_id)
        .await
        .map_err(|e| OvirtError::remote("failed to list networks", e))?;
    let network = networks
        .iter()
        .find(|n| n.name == platform.network_name)
        .ok_or_else(|| {
            OvirtError::NotFound(format!(
                "network {} is not attached to cluster {}",
                platform.network_name, platform.cluster_id
            ))
        })?;

    let profiles = api
        .list_vnic_profiles(&network.id)
        .await
        .map_err(|e| OvirtError::remote("failed to list VNIC profiles", e))?;
    match profiles.as_slice() {
        [only] => {
            info!("Using VNIC profile {} ({})", only.name, only.id);
            platform.vnic_profile_id = only.id.clone();
            Ok(())
        }
        _ => Err(OvirtError::Config(format!(
            "cannot pick a VNIC profile: network {} has {} of them, set vnicProfileID",
            network.name,
            profiles.len()
        ))),
    }
}

pub async fn ask_template(
    api: &dyn OvirtApi,
    prompter: &dyn Prompter,
    cluster: &Cluster,
) -> Result<Template> {
    let templates = api
        .list_templates(&cluster.name)
        .await
        .map_err(|e| OvirtError::remote("failed to list templates", e))?;
    if templates.is_empty() {
        return Err(OvirtError::NotFound(format!(
            "no templates are available in cluster {}",
            cluster.name
        )));
    }

    let template = choose(
        prompter,
        "Template",
        "The template the VMs will be created from.",
        &templates,
        |t| t.name.as_str(),
    )?
    .clone();

    info!("Using template {} ({})", template.name, template.id);
    Ok(template)
}
