use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use reqwest::Url;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use crate::client::{Connector, OvirtApi};
use crate::config::{Config, ConfigLocation};
use crate::pickers::{
    ask_cluster, ask_network, ask_storage_domain, ask_template, ask_vnic_profile,
    resolve_vnic_profile,
};
use crate::platform::{InstallConfig, Platform};
use crate::prompt::{required, Prompter};
use crate::tfvars::TerraformVariables;
use crate::validation::validate_for_provisioning;
use crate::{OvirtError, Result};

const DEFAULT_USERNAME: &str = "admin@internal";

/// The platform flow failed. `partial` holds whatever the pickers had filled
/// in when the failure happened, and is `None` if no picker ran.
#[derive(thiserror::Error, Debug)]
#[error("{source}")]
pub struct PlatformFailure {
    pub partial: Option<Platform>,
    #[source]
    pub source: OvirtError,
}

impl PlatformFailure {
    fn early(source: OvirtError) -> Self {
        Self {
            partial: None,
            source,
        }
    }

    fn partial(platform: Platform, source: OvirtError) -> Self {
        Self {
            partial: Some(platform),
            source,
        }
    }
}

/// Interactive construction of the oVirt platform section.
pub struct PlatformWizard<'a> {
    location: ConfigLocation,
    connector: &'a dyn Connector,
    prompter: &'a dyn Prompter,
}

impl<'a> PlatformWizard<'a> {
    pub fn new(
        location: ConfigLocation,
        connector: &'a dyn Connector,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            location,
            connector,
            prompter,
        }
    }

    /// Credentials, connection test, cluster/storage/network/VNIC profile and VIPs.
    ///
    /// Credentials typed in by the user are saved once the flow ends, whether
    /// it succeeded or not.
    pub async fn platform(&self) -> std::result::Result<Platform, PlatformFailure> {
        let (config, prompted) = match Config::load(&self.location).await {
            Ok(config) => (config, false),
            Err(err) => {
                info!(
                    "No usable engine config at {} ({}), asking for credentials",
                    self.location.path().display(),
                    err
                );
                self.print_welcome();
                let config = ask_credentials(self.prompter)
                    .await
                    .map_err(PlatformFailure::early)?;
                (config, true)
            }
        };

        let outcome = self.connect_and_survey(&config).await;

        if !prompted {
            return outcome;
        }

        match (outcome, config.save(&self.location).await) {
            (outcome, Ok(())) => outcome,
            (Ok(platform), Err(err)) => Err(PlatformFailure::partial(platform, err)),
            (Err(failure), Err(err)) => {
                warn!(
                    "Failed to save engine config to {}: {}",
                    self.location.path().display(),
                    err
                );
                Err(failure)
            }
        }
    }

    async fn connect_and_survey(
        &self,
        config: &Config,
    ) -> std::result::Result<Platform, PlatformFailure> {
        let api = self.connector.connect(config).await.map_err(|e| {
            PlatformFailure::early(OvirtError::remote("failed to build the engine connection", e))
        })?;

        let outcome = self.survey(api.as_ref()).await;

        if let Err(err) = api.close().await {
            warn!("Failed to close the engine connection: {}", err);
        }
        outcome
    }

    async fn survey(&self, api: &dyn OvirtApi) -> std::result::Result<Platform, PlatformFailure> {
        let progress = spinner("Contacting the engine...");
        let tested = api.test().await;
        progress.finish_and_clear();
        tested.map_err(|e| {
            PlatformFailure::early(OvirtError::remote("failed to connect to the engine", e))
        })?;

        let mut platform = Platform::default();

        let cluster = match ask_cluster(api, self.prompter, &mut platform).await {
            Ok(cluster) => cluster,
            Err(err) => return Err(PlatformFailure::partial(platform, err)),
        };
        if let Err(err) = ask_storage_domain(api, self.prompter, &cluster, &mut platform).await {
            return Err(PlatformFailure::partial(platform, err));
        }
        let network = match ask_network(api, self.prompter, &cluster, &mut platform).await {
            Ok(network) => network,
            Err(err) => return Err(PlatformFailure::partial(platform, err)),
        };
        if let Err(err) = ask_vnic_profile(api, self.prompter, &network, &mut platform).await {
            return Err(PlatformFailure::partial(platform, err));
        }

        let api_vip = match self.prompter.input("Internal API virtual IP", None, &ip_address) {
            Ok(answer) => answer,
            Err(err) => return Err(PlatformFailure::partial(platform, err)),
        };
        platform.api_vip = api_vip;

        let dns_vip = match self.prompter.input("Internal DNS virtual IP", None, &ip_address) {
            Ok(answer) => answer,
            Err(err) => return Err(PlatformFailure::partial(platform, err)),
        };
        platform.dns_vip = dns_vip;

        let ingress_vip = match self.prompter.input("Ingress virtual IP", None, &ip_address) {
            Ok(answer) => answer,
            Err(err) => return Err(PlatformFailure::partial(platform, err)),
        };
        platform.ingress_vip = ingress_vip;

        Ok(platform)
    }

    /// Terraform variables for `platform`; asks for a template when none is given.
    ///
    /// A missing VNIC profile is filled in from the network's only profile.
    pub async fn terraform_variables(
        &self,
        platform: &mut Platform,
        template_id: Option<&str>,
    ) -> Result<TerraformVariables> {
        let config = self.load_config().await?;
        if let (Some(template_id), false) = (template_id, platform.vnic_profile_id.is_empty()) {
            return Ok(TerraformVariables::new(&config, &platform.cluster_id, template_id));
        }

        let api = self.connector.connect(&config).await?;
        let resolved = self
            .resolve_for_provisioning(api.as_ref(), platform, template_id)
            .await;
        if let Err(err) = api.close().await {
            warn!("Failed to close the engine connection: {}", err);
        }

        Ok(TerraformVariables::new(&config, &platform.cluster_id, &resolved?))
    }

    async fn resolve_for_provisioning(
        &self,
        api: &dyn OvirtApi,
        platform: &mut Platform,
        template_id: Option<&str>,
    ) -> Result<String> {
        resolve_vnic_profile(api, platform).await?;
        if let Some(template_id) = template_id {
            return Ok(template_id.to_string());
        }

        let cluster = api
            .get_cluster(&platform.cluster_id)
            .await
            .map_err(|e| OvirtError::remote("failed to get cluster", e))?;
        Ok(ask_template(api, self.prompter, &cluster).await?.id)
    }

    /// Validate `install_config` against the engine.
    pub async fn validate_remote(&self, install_config: &InstallConfig) -> Result<()> {
        let config = self.load_config().await?;
        let api = self.connector.connect(&config).await?;

        let progress = spinner("Validating against the engine...");
        let outcome = validate_for_provisioning(api.as_ref(), install_config).await;
        progress.finish_and_clear();

        if let Err(err) = api.close().await {
            warn!("Failed to close the engine connection: {}", err);
        }
        outcome
    }

    async fn load_config(&self) -> Result<Config> {
        Config::load(&self.location).await.map_err(|e| {
            OvirtError::remote(
                format!(
                    "failed to load engine config from {}",
                    self.location.path().display()
                ),
                e,
            )
        })
    }

    fn print_welcome(&self) {
        println!("{}", "oVirt platform setup".bold().blue());
        println!(
            "{}",
            "Engine credentials will be saved for the next run.".white()
        );
        println!();
    }
}

/// Ask for the engine URL, CA trust and credentials.
pub async fn ask_credentials(prompter: &dyn Prompter) -> Result<Config> {
    let url = prompter.input(
        "Engine API URL (e.g. https://engine.example.com/ovirt-engine/api)",
        None,
        &engine_url,
    )?;

    let mut config = Config {
        url,
        ..Default::default()
    };

    let trusted = prompter.confirm("Is the engine CA trusted locally?", true)?;
    if !trusted {
        let bundle_path = prompter.input(
            "Path to the engine CA bundle (empty to skip certificate verification)",
            Some(""),
            &existing_file_or_empty,
        )?;
        if bundle_path.is_empty() {
            config.insecure = true;
        } else {
            config.ca_bundle = Some(tokio::fs::read_to_string(&bundle_path).await?);
        }
    }

    config.username = prompter.input("Engine username", Some(DEFAULT_USERNAME), &required)?;
    config.password = prompter.password("Engine password")?;
    if config.password.is_empty() {
        return Err(OvirtError::Config("a password is required".to_string()));
    }

    Ok(config)
}

fn engine_url(answer: &str) -> std::result::Result<(), String> {
    required(answer)?;
    let url = Url::parse(answer.trim()).map_err(|e| format!("invalid URL: {}", e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme {:?}, use https", other)),
    }
}

fn existing_file_or_empty(answer: &str) -> std::result::Result<(), String> {
    let answer = answer.trim();
    if answer.is_empty() || Path::new(answer).is_file() {
        Ok(())
    } else {
        Err(format!("{} is not a file", answer))
    }
}

fn ip_address(answer: &str) -> std::result::Result<(), String> {
    required(answer)?;
    answer
        .trim()
        .parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| format!("{} is not a valid IP address", answer.trim()))
}

fn spinner(message: &'static str) -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.blue} {msg}") {
        progress.set_style(style);
    }
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}
