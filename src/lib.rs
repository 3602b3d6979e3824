//! # ovirt-installer - oVirt platform support for cluster installs
//!
//! Gathers the oVirt section of an install config interactively, validates it
//! (offline and against a live engine) and produces the Terraform variables the
//! provisioning step consumes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ovirt_installer::client::RestConnector;
//! use ovirt_installer::config::ConfigLocation;
//! use ovirt_installer::prompt::TerminalPrompter;
//! use ovirt_installer::wizard::PlatformWizard;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let location = ConfigLocation::discover()?;
//!     let connector = RestConnector::new();
//!     let prompter = TerminalPrompter::new();
//!
//!     let wizard = PlatformWizard::new(location, &connector, &prompter);
//!     let platform = wizard.platform().await?;
//!
//!     println!("{}", serde_yaml::to_string(&platform)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - credentials file discovery, load and save
//! - [`client`] - oVirt engine API trait and its REST implementation
//! - [`prompt`] - interactive prompt abstraction
//! - [`pickers`] - cluster, storage domain, network, VNIC profile and template selection
//! - [`version`] - engine version parsing and support gate
//! - [`platform`] - platform and machine pool configuration types
//! - [`field`] - field-path scoped validation errors
//! - [`validation`] - static and remote validation
//! - [`tfvars`] - Terraform variables
//! - [`wizard`] - the interactive platform flow

pub mod client;
pub mod config;
pub mod field;
pub mod pickers;
pub mod platform;
pub mod prompt;
pub mod tfvars;
pub mod validation;
pub mod version;
pub mod wizard;

pub use client::{Connector, OvirtApi, RestClient, RestConnector};
pub use config::{Config, ConfigLocation};
pub use field::{FieldError, FieldPath, ValidationErrors};
pub use platform::{AffinityGroup, InstallConfig, MachinePool, Platform};
pub use prompt::{Prompter, TerminalPrompter};
pub use tfvars::TerraformVariables;
pub use version::{EngineVersion, VersionError};
pub use wizard::{PlatformFailure, PlatformWizard};

/// Current version of ovirt-installer
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the platform, as used for the install config `platform` key.
pub const PLATFORM_NAME: &str = "ovirt";

/// ovirt-installer library error types
#[derive(thiserror::Error, Debug)]
pub enum OvirtError {
    /// IO error occurred during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The engine answered with a non-success status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// SSO rejected the credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A requested resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Interactive prompt failed
    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// Unsupported or unparsable engine version
    #[error(transparent)]
    Version(#[from] VersionError),

    /// One or more field validation errors
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// A remote operation failed; carries the failing operation
    #[error("{operation}: {source}")]
    Remote {
        operation: String,
        #[source]
        source: Box<OvirtError>,
    },
}

impl OvirtError {
    /// Wrap an error with the name of the remote operation that produced it.
    pub fn remote(operation: impl Into<String>, source: OvirtError) -> Self {
        OvirtError::Remote {
            operation: operation.into(),
            source: Box::new(source),
        }
    }
}

/// Result type alias for ovirt-installer operations
pub type Result<T> = std::result::Result<T, OvirtError>;
