use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::Config;
use crate::Result;

/// Variables handed to the Terraform provisioning step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerraformVariables {
    pub ovirt_url: String,
    pub ovirt_username: String,
    pub ovirt_password: String,
    pub ovirt_cafile: String,
    pub ovirt_cluster_id: String,
    pub ovirt_template_id: String,
}

impl TerraformVariables {
    pub fn new(config: &Config, cluster_id: &str, template_id: &str) -> Self {
        Self {
            ovirt_url: config.url.clone(),
            ovirt_username: config.username.clone(),
            ovirt_password: config.password.clone(),
            ovirt_cafile: config
                .ca_file
                .as_deref()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default(),
            ovirt_cluster_id: cluster_id.to_string(),
            ovirt_template_id: template_id.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.to_json()?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exact_key_set() {
        let config = Config {
            url: "https://engine/ovirt-engine/api".to_string(),
            username: "admin@internal".to_string(),
            password: "secret".to_string(),
            ca_file: Some(PathBuf::from("/etc/pki/ovirt-engine/ca.pem")),
            insecure: false,
            ca_bundle: None,
        };
        let vars = TerraformVariables::new(&config, "cluster-1", "template-1");
        let value: serde_json::Value = serde_json::from_str(&vars.to_json().unwrap()).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "ovirt_cafile",
                "ovirt_cluster_id",
                "ovirt_password",
                "ovirt_template_id",
                "ovirt_url",
                "ovirt_username",
            ]
        );
        assert_eq!(object["ovirt_cafile"], "/etc/pki/ovirt-engine/ca.pem");
        assert_eq!(object["ovirt_template_id"], "template-1");
    }

    #[test]
    fn test_missing_ca_file_is_empty_string() {
        let vars = TerraformVariables::new(&Config::default(), "c", "t");
        assert_eq!(vars.ovirt_cafile, "");
    }
}
