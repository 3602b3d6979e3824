#![allow(dead_code)]

use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::VecDeque;

use ovirt_installer::client::{
    Cluster, Connector, Host, InstanceType, Network, OvirtApi, RemoteAffinityGroup,
    StorageDomain, Template, VnicProfile,
};
use ovirt_installer::config::Config;
use ovirt_installer::prompt::{Prompter, Validator};
use ovirt_installer::{OvirtError, Result};

pub const CLUSTER_ID: &str = "3d7d1a0e-8b33-4a1c-9cfd-0f0b6a7b1c11";
pub const STORAGE_ID: &str = "5b1c2f7e-1b2a-4c3d-8e9f-0a1b2c3d4e5f";
pub const NETWORK_ID: &str = "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d";
pub const PROFILE_ID: &str = "0000000a-000a-000a-000a-000000000398";
pub const INSTANCE_TYPE_ID: &str = "00000003-0003-0003-0003-0000000000be";

/// Answers prompts from a script and records every question asked.
#[derive(Default)]
pub struct ScriptedPrompter {
    inputs: RefCell<VecDeque<String>>,
    choices: RefCell<VecDeque<String>>,
    password: String,
    pub asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inputs(inputs: &[&str]) -> Self {
        Self {
            inputs: RefCell::new(inputs.iter().map(|s| s.to_string()).collect()),
            password: "secret".to_string(),
            ..Default::default()
        }
    }

    /// Answers for select prompts, in order; the first item is chosen once these run out.
    pub fn choosing(self, choices: &[&str]) -> Self {
        *self.choices.borrow_mut() = choices.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn asked_about(&self, needle: &str) -> bool {
        self.asked.borrow().iter().any(|q| q.contains(needle))
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&self, prompt: &str, _help: &str, items: &[String]) -> Result<String> {
        self.asked.borrow_mut().push(prompt.to_string());
        Ok(self
            .choices
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| items[0].clone()))
    }

    fn input(&self, prompt: &str, _default: Option<&str>, validate: Validator<'_>) -> Result<String> {
        self.asked.borrow_mut().push(prompt.to_string());
        let answer = self
            .inputs
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| OvirtError::Config(format!("no scripted answer for {:?}", prompt)))?;
        validate(&answer).map_err(OvirtError::Config)?;
        Ok(answer)
    }

    fn password(&self, prompt: &str) -> Result<String> {
        self.asked.borrow_mut().push(prompt.to_string());
        Ok(self.password.clone())
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        self.asked.borrow_mut().push(prompt.to_string());
        Ok(default)
    }
}

/// In-memory engine.
#[derive(Clone, Default)]
pub struct FakeApi {
    pub version: String,
    pub clusters: Vec<Cluster>,
    pub storage_domains: Vec<StorageDomain>,
    pub networks: Vec<Network>,
    pub vnic_profiles: Vec<VnicProfile>,
    pub templates: Vec<Template>,
    pub affinity_groups: Vec<RemoteAffinityGroup>,
    pub hosts: Vec<Host>,
    pub instance_types: Vec<InstanceType>,
}

impl FakeApi {
    /// One of everything, all valid.
    pub fn single() -> Self {
        Self {
            version: "4.4.10.7-0.1.el8ev".to_string(),
            clusters: vec![Cluster {
                id: CLUSTER_ID.to_string(),
                name: "Default".to_string(),
                data_center_id: "dc-1".to_string(),
            }],
            storage_domains: vec![StorageDomain {
                id: STORAGE_ID.to_string(),
                name: "hosted_storage".to_string(),
                kind: "data".to_string(),
                status: "active".to_string(),
            }],
            networks: vec![Network {
                id: NETWORK_ID.to_string(),
                name: "ovirtmgmt".to_string(),
            }],
            vnic_profiles: vec![VnicProfile {
                id: PROFILE_ID.to_string(),
                name: "ovirtmgmt".to_string(),
                network_id: NETWORK_ID.to_string(),
            }],
            templates: vec![Template {
                id: "tpl-1".to_string(),
                name: "rhcos".to_string(),
            }],
            affinity_groups: Vec::new(),
            hosts: (1..=3)
                .map(|i| Host {
                    id: format!("host-{}", i),
                    name: format!("host{}.example.com", i),
                    status: "up".to_string(),
                })
                .collect(),
            instance_types: vec![InstanceType {
                id: INSTANCE_TYPE_ID.to_string(),
                name: "Large".to_string(),
            }],
        }
    }
}

#[async_trait]
impl OvirtApi for FakeApi {
    async fn test(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn engine_version(&self) -> Result<String> {
        Ok(self.version.clone())
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        Ok(self.clusters.clone())
    }

    async fn list_storage_domains(&self, data_center_id: &str) -> Result<Vec<StorageDomain>> {
        let known = self.clusters.iter().any(|c| c.data_center_id == data_center_id);
        Ok(if known {
            self.storage_domains.clone()
        } else {
            Vec::new()
        })
    }

    async fn list_networks(&self, cluster_id: &str) -> Result<Vec<Network>> {
        let known = self.clusters.iter().any(|c| c.id == cluster_id);
        Ok(if known { self.networks.clone() } else { Vec::new() })
    }

    async fn list_vnic_profiles(&self, network_id: &str) -> Result<Vec<VnicProfile>> {
        Ok(self
            .vnic_profiles
            .iter()
            .filter(|p| p.network_id == network_id)
            .cloned()
            .collect())
    }

    async fn list_templates(&self, _cluster_name: &str) -> Result<Vec<Template>> {
        Ok(self.templates.clone())
    }

    async fn list_affinity_groups(&self, _cluster_id: &str) -> Result<Vec<RemoteAffinityGroup>> {
        Ok(self.affinity_groups.clone())
    }

    async fn list_hosts(&self, _cluster_name: &str) -> Result<Vec<Host>> {
        Ok(self.hosts.clone())
    }

    async fn get_instance_type(&self, id: &str) -> Result<InstanceType> {
        self.instance_types
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| OvirtError::NotFound(format!("/instancetypes/{}", id)))
    }
}

/// Hands out copies of one [`FakeApi`].
pub struct FakeConnector(pub FakeApi);

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _config: &Config) -> Result<Box<dyn OvirtApi>> {
        Ok(Box::new(self.0.clone()))
    }
}
