use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::{OvirtError, Result};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "OVIRT_CONFIG";

const CONFIG_DIR: &str = ".ovirt";
const CONFIG_FILE: &str = "ovirt-config.yaml";

/// Engine credentials and TLS settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "ovirt_url")]
    pub url: String,
    #[serde(rename = "ovirt_username")]
    pub username: String,
    #[serde(rename = "ovirt_password")]
    pub password: String,
    #[serde(rename = "ovirt_cafile", default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,
    #[serde(rename = "ovirt_insecure", default)]
    pub insecure: bool,
    #[serde(rename = "ovirt_ca_bundle", default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,
}

/// Where the credentials file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    path: PathBuf,
}

impl ConfigLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolve from `OVIRT_CONFIG`, falling back to `$HOME/.ovirt/ovirt-config.yaml`.
    pub fn discover() -> Result<Self> {
        Self::resolve(
            std::env::var(CONFIG_ENV).ok(),
            std::env::var_os("HOME").map(PathBuf::from),
        )
    }

    /// Resolution with the environment passed in.
    pub fn resolve(override_path: Option<String>, home: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = override_path.filter(|p| !p.is_empty()) {
            return Ok(Self::new(path));
        }

        let home = home.ok_or_else(|| {
            OvirtError::Config(format!(
                "cannot locate the config file: neither {} nor HOME is set",
                CONFIG_ENV
            ))
        })?;
        Ok(Self::new(home.join(CONFIG_DIR).join(CONFIG_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Config {
    /// Read the credentials file.
    pub async fn load(location: &ConfigLocation) -> Result<Self> {
        let content = tokio::fs::read_to_string(location.path()).await?;
        let config: Config = serde_yaml::from_str(&content)?;
        debug!("Loaded engine config from {}", location.path().display());
        Ok(config)
    }

    /// Write the credentials file, owner-only.
    pub async fn save(&self, location: &ConfigLocation) -> Result<()> {
        let path = location.path();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            let mut builder = tokio::fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            builder.mode(0o700);
            builder.create(dir).await?;
        }

        let content = serde_yaml::to_string(self)?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        info!("Saved engine config to {}", path.display());
        Ok(())
    }

    /// PEM material to trust, from the inline bundle or the CA file.
    pub async fn ca_pem(&self) -> Result<Option<String>> {
        if let Some(bundle) = self.ca_bundle.as_ref().filter(|b| !b.trim().is_empty()) {
            return Ok(Some(bundle.clone()));
        }
        match &self.ca_file {
            Some(file) => Ok(Some(tokio::fs::read_to_string(file).await?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Config {
        Config {
            url: "https://engine.example.com/ovirt-engine/api".to_string(),
            username: "admin@internal".to_string(),
            password: "secret".to_string(),
            ca_file: None,
            insecure: true,
            ca_bundle: None,
        }
    }

    #[test]
    fn test_resolve_prefers_override() {
        let location = ConfigLocation::resolve(
            Some("/etc/ovirt.yaml".to_string()),
            Some(PathBuf::from("/home/user")),
        )
        .unwrap();
        assert_eq!(location.path(), Path::new("/etc/ovirt.yaml"));
    }

    #[test]
    fn test_resolve_falls_back_to_home() {
        let location = ConfigLocation::resolve(None, Some(PathBuf::from("/home/user"))).unwrap();
        assert_eq!(
            location.path(),
            Path::new("/home/user/.ovirt/ovirt-config.yaml")
        );

        let location =
            ConfigLocation::resolve(Some(String::new()), Some(PathBuf::from("/root"))).unwrap();
        assert_eq!(location.path(), Path::new("/root/.ovirt/ovirt-config.yaml"));
    }

    #[test]
    fn test_resolve_without_home_fails() {
        assert!(matches!(
            ConfigLocation::resolve(None, None),
            Err(OvirtError::Config(_))
        ));
    }

    #[test]
    fn test_yaml_keys() {
        let yaml = serde_yaml::to_string(&sample()).unwrap();
        assert!(yaml.contains("ovirt_url:"));
        assert!(yaml.contains("ovirt_username:"));
        assert!(yaml.contains("ovirt_password:"));
        assert!(yaml.contains("ovirt_insecure: true"));
        assert!(!yaml.contains("ovirt_cafile"));

        let parsed: Config = serde_yaml::from_str(
            "ovirt_url: https://e/ovirt-engine/api\novirt_username: u\novirt_password: p\novirt_cafile: /tmp/ca.pem\n",
        )
        .unwrap();
        assert_eq!(parsed.ca_file, Some(PathBuf::from("/tmp/ca.pem")));
        assert!(!parsed.insecure);
    }

    #[tokio::test]
    async fn test_save_and_load() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let location = ConfigLocation::new(temp_dir.path().join("nested/.ovirt/ovirt-config.yaml"));

        sample().save(&location).await?;
        let loaded = Config::load(&location).await?;
        assert_eq!(loaded, sample());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let file_mode = std::fs::metadata(location.path())?.permissions().mode();
            assert_eq!(file_mode & 0o777, 0o600);
            let dir_mode = std::fs::metadata(location.path().parent().unwrap())?
                .permissions()
                .mode();
            assert_eq!(dir_mode & 0o777, 0o700);
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let location = ConfigLocation::new(temp_dir.path().join("absent.yaml"));
        assert!(matches!(Config::load(&location).await, Err(OvirtError::Io(_))));
    }

    #[tokio::test]
    async fn test_ca_pem_prefers_bundle() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let ca_file = temp_dir.path().join("ca.pem");
        tokio::fs::write(&ca_file, "FROM FILE").await?;

        let mut config = sample();
        config.ca_file = Some(ca_file);
        assert_eq!(config.ca_pem().await?.as_deref(), Some("FROM FILE"));

        config.ca_bundle = Some("FROM BUNDLE".to_string());
        assert_eq!(config.ca_pem().await?.as_deref(), Some("FROM BUNDLE"));
        Ok(())
    }
}
