use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ovirt_installer::client::{RestConnector, DEFAULT_TIMEOUT_SECS};
use ovirt_installer::config::ConfigLocation;
use ovirt_installer::platform::{apply_defaults, InstallConfig};
use ovirt_installer::prompt::TerminalPrompter;
use ovirt_installer::validation::validate_install_config;
use ovirt_installer::version::{check_release_support, parse_release, MINIMUM_ENGINE_VERSION};
use ovirt_installer::wizard::PlatformWizard;

#[derive(Parser)]
#[command(name = "ovirt-installer")]
#[command(about = "oVirt platform configuration for cluster installs")]
#[command(version)]
struct Cli {
    /// Engine credentials file (default: $HOME/.ovirt/ovirt-config.yaml)
    #[arg(long, global = true, env = "OVIRT_CONFIG")]
    config: Option<PathBuf>,

    /// Engine API request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactively build the oVirt platform section
    Platform {
        /// Write the platform YAML here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate an install config
    Validate {
        /// Path to install-config.yaml
        #[arg(short, long)]
        input: PathBuf,
        /// Also validate against the engine
        #[arg(short, long)]
        remote: bool,
    },
    /// Emit Terraform variables for an install config
    Tfvars {
        /// Path to install-config.yaml
        #[arg(short, long)]
        input: PathBuf,
        /// Template to provision from; asked interactively when omitted
        #[arg(short, long)]
        template_id: Option<String>,
        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check an engine version against the supported minimum
    VersionCheck {
        /// Engine version, e.g. 4.4.10.7-0.1.el8ev
        current: String,
        /// Minimum required version
        #[arg(short, long, default_value = MINIMUM_ENGINE_VERSION)]
        required: String,
    },
}

async fn read_install_config(path: &Path) -> Result<InstallConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut config = InstallConfig::from_yaml(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    apply_defaults(&mut config);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let location = || -> Result<ConfigLocation> {
        match &cli.config {
            Some(path) => Ok(ConfigLocation::new(path)),
            None => Ok(ConfigLocation::discover()?),
        }
    };

    match &cli.command {
        Commands::Platform { output } => {
            let connector = RestConnector::with_timeout(Duration::from_secs(cli.timeout));
            let prompter = TerminalPrompter::new();
            let wizard = PlatformWizard::new(location()?, &connector, &prompter);

            let platform = match wizard.platform().await {
                Ok(platform) => platform,
                Err(failure) => {
                    if let Some(partial) = &failure.partial {
                        eprintln!("{}", "Platform collected before the failure:".yellow());
                        eprint!("{}", serde_yaml::to_string(partial)?);
                    }
                    return Err(failure.into());
                }
            };
            let yaml = serde_yaml::to_string(&platform)?;

            match output {
                Some(path) => {
                    tokio::fs::write(path, yaml).await?;
                    println!(
                        "{}",
                        format!("Platform saved to {}", path.display()).bold().green()
                    );
                }
                None => print!("{}", yaml),
            }
        }

        Commands::Validate { input, remote } => {
            let config = read_install_config(input).await?;
            validate_install_config(&config)?;
            println!("{}", "Install config is valid".bold().green());

            if *remote {
                let connector = RestConnector::with_timeout(Duration::from_secs(cli.timeout));
                let prompter = TerminalPrompter::new();
                let wizard = PlatformWizard::new(location()?, &connector, &prompter);
                wizard.validate_remote(&config).await?;
                println!("{}", "Engine accepts the install config".bold().green());
            }
        }

        Commands::Tfvars {
            input,
            template_id,
            output,
        } => {
            let config = read_install_config(input).await?;
            validate_install_config(&config)?;

            let connector = RestConnector::with_timeout(Duration::from_secs(cli.timeout));
            let prompter = TerminalPrompter::new();
            let wizard = PlatformWizard::new(location()?, &connector, &prompter);
            let mut platform = config.ovirt()?.clone();
            let vars = wizard
                .terraform_variables(&mut platform, template_id.as_deref())
                .await?;

            match output {
                Some(path) => {
                    vars.save(path).await?;
                    println!(
                        "{}",
                        format!("Terraform variables saved to {}", path.display())
                            .bold()
                            .green()
                    );
                }
                None => println!("{}", vars.to_json()?),
            }
        }

        Commands::VersionCheck { current, required } => {
            let current_version = parse_release(current)?;
            let required_version = parse_release(required)?;
            check_release_support(&current_version, &required_version)
                .with_context(|| format!("Engine {} is not supported", current))?;
            println!(
                "{}",
                format!(
                    "Engine {} satisfies the minimum {}",
                    current_version, required_version
                )
                .bold()
                .green()
            );
        }
    }

    Ok(())
}
