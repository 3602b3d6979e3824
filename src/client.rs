//! oVirt engine API.
//!
//! [`OvirtApi`] is the read-only surface the installer needs. [`RestClient`]
//! implements it over the engine's REST API; [`RestConnector`] builds one from
//! a [`Config`].

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Certificate, Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::{OvirtError, Result};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const SSO_SCOPE: &str = "ovirt-app-api";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub data_center_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDomain {
    pub id: String,
    pub name: String,
    /// `data`, `iso`, `export`, ...
    pub kind: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VnicProfile {
    pub id: String,
    pub name: String,
    pub network_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAffinityGroup {
    pub id: String,
    pub name: String,
    pub priority: f64,
    pub enforcing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: String,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceType {
    pub id: String,
    pub name: String,
}

/// Read-only engine operations used by the pickers and validators.
#[async_trait]
pub trait OvirtApi: Send + Sync {
    /// Authenticate and reach the API root.
    async fn test(&self) -> Result<()>;

    /// Release the session. Safe to call when nothing was opened.
    async fn close(&self) -> Result<()>;

    /// Engine release string, e.g. `4.4.10.7-0.1.el8ev`.
    async fn engine_version(&self) -> Result<String>;

    async fn list_clusters(&self) -> Result<Vec<Cluster>>;

    async fn list_storage_domains(&self, data_center_id: &str) -> Result<Vec<StorageDomain>>;

    async fn list_networks(&self, cluster_id: &str) -> Result<Vec<Network>>;

    async fn list_vnic_profiles(&self, network_id: &str) -> Result<Vec<VnicProfile>>;

    async fn list_templates(&self, cluster_name: &str) -> Result<Vec<Template>>;

    async fn list_affinity_groups(&self, cluster_id: &str) -> Result<Vec<RemoteAffinityGroup>>;

    async fn list_hosts(&self, cluster_name: &str) -> Result<Vec<Host>>;

    async fn get_instance_type(&self, id: &str) -> Result<InstanceType>;

    /// Look a cluster up by id among [`OvirtApi::list_clusters`].
    async fn get_cluster(&self, id: &str) -> Result<Cluster> {
        self.list_clusters()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| OvirtError::NotFound(format!("cluster {}", id)))
    }
}

/// Opens API sessions from engine credentials.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &Config) -> Result<Box<dyn OvirtApi>>;
}

#[derive(Debug, Clone, Default)]
pub struct RestConnector {
    timeout: Option<Duration>,
}

impl RestConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

#[async_trait]
impl Connector for RestConnector {
    async fn connect(&self, config: &Config) -> Result<Box<dyn OvirtApi>> {
        let client = RestClient::open(
            config,
            self.timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        )
        .await?;
        Ok(Box::new(client))
    }
}

/// REST client for one engine.
pub struct RestClient {
    client: Client,
    api_url: String,
    sso_url: Url,
    revoke_url: Url,
    username: String,
    password: String,
    token: OnceCell<String>,
}

impl RestClient {
    /// Build the HTTP client. No request is made until the first call.
    pub async fn open(config: &Config, timeout: Duration) -> Result<Self> {
        let api_url = Url::parse(&config.url)
            .map_err(|e| OvirtError::Config(format!("invalid engine URL {:?}: {}", config.url, e)))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(OvirtError::Config(format!(
                "engine URL {:?} must use http or https",
                config.url
            )));
        }

        let mut builder = Client::builder().timeout(timeout);
        if config.insecure {
            warn!("TLS verification of the engine certificate is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(pem) = config.ca_pem().await? {
            let certs = split_pem_bundle(&pem);
            if certs.is_empty() {
                return Err(OvirtError::Config(
                    "no certificate found in CA bundle".to_string(),
                ));
            }
            for cert in certs {
                let cert = Certificate::from_pem(cert.as_bytes()).map_err(|e| {
                    OvirtError::Config(format!("invalid CA certificate: {}", e))
                })?;
                builder = builder.add_root_certificate(cert);
            }
        }

        let (sso_url, revoke_url) = sso_urls(&api_url);

        Ok(Self {
            client: builder.build()?,
            api_url: config.url.trim_end_matches('/').to_string(),
            sso_url,
            revoke_url,
            username: config.username.clone(),
            password: config.password.clone(),
            token: OnceCell::new(),
        })
    }

    async fn token(&self) -> Result<&str> {
        let token = self
            .token
            .get_or_try_init(|| async { self.request_token().await })
            .await?;
        Ok(token.as_str())
    }

    async fn request_token(&self) -> Result<String> {
        debug!("Requesting SSO token from {}", self.sso_url);

        let params = [
            ("grant_type", "password"),
            ("scope", SSO_SCOPE),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];
        let response = self
            .client
            .post(self.sso_url.clone())
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body: SsoResponse = response.json().await.map_err(|e| {
            OvirtError::Auth(format!("unexpected SSO response ({}): {}", status, e))
        })?;

        match (body.access_token, body.error) {
            (Some(token), _) if status.is_success() => Ok(token),
            (_, Some(error)) => Err(OvirtError::Auth(format!(
                "{}: {}",
                error,
                body.error_description.unwrap_or_default()
            ))),
            _ => Err(OvirtError::Auth(format!(
                "SSO answered {} without a token",
                status
            ))),
        }
    }

    /// Make an authenticated GET request below the API root.
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.api_url, path);
        debug!("GET {} {:?}", url, query);

        let token = self.token().await?;
        let mut request = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .header("Version", "4");
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(OvirtError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OvirtError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl OvirtApi for RestClient {
    async fn test(&self) -> Result<()> {
        self.get::<ApiRoot>("", &[]).await.map(|_| ())
    }

    async fn close(&self) -> Result<()> {
        let Some(token) = self.token.get() else {
            return Ok(());
        };
        debug!("Revoking SSO token");

        let response = self
            .client
            .post(self.revoke_url.clone())
            .header("Accept", "application/json")
            .form(&[("scope", SSO_SCOPE), ("token", token.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(OvirtError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }

    async fn engine_version(&self) -> Result<String> {
        let root: ApiRoot = self.get("", &[]).await?;
        root.product_info
            .and_then(|p| p.version)
            .map(|v| v.full_version)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| OvirtError::NotFound("engine product version".to_string()))
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        let list: ClusterList = self.get("/clusters", &[]).await?;
        Ok(list
            .cluster
            .into_iter()
            .map(|c| Cluster {
                id: c.id,
                name: c.name,
                data_center_id: c.data_center.map(|d| d.id).unwrap_or_default(),
            })
            .collect())
    }

    async fn list_storage_domains(&self, data_center_id: &str) -> Result<Vec<StorageDomain>> {
        let list: StorageDomainList = self
            .get(&format!("/datacenters/{}/storagedomains", data_center_id), &[])
            .await?;
        Ok(list
            .storage_domain
            .into_iter()
            .map(|s| StorageDomain {
                id: s.id,
                name: s.name,
                kind: s.kind,
                status: s.status,
            })
            .collect())
    }

    async fn list_networks(&self, cluster_id: &str) -> Result<Vec<Network>> {
        let list: NetworkList = self
            .get(&format!("/clusters/{}/networks", cluster_id), &[])
            .await?;
        Ok(list
            .network
            .into_iter()
            .map(|n| Network {
                id: n.id,
                name: n.name,
            })
            .collect())
    }

    async fn list_vnic_profiles(&self, network_id: &str) -> Result<Vec<VnicProfile>> {
        let list: VnicProfileList = self
            .get(&format!("/networks/{}/vnicprofiles", network_id), &[])
            .await?;
        Ok(list
            .vnic_profile
            .into_iter()
            .map(|p| VnicProfile {
                id: p.id,
                name: p.name,
                network_id: p
                    .network
                    .map(|n| n.id)
                    .unwrap_or_else(|| network_id.to_string()),
            })
            .collect())
    }

    async fn list_templates(&self, cluster_name: &str) -> Result<Vec<Template>> {
        let search = cluster_search(cluster_name);
        let list: TemplateList = self.get("/templates", &[("search", search.as_str())]).await?;
        Ok(list
            .template
            .into_iter()
            .map(|t| Template {
                id: t.id,
                name: t.name,
            })
            .collect())
    }

    async fn list_affinity_groups(&self, cluster_id: &str) -> Result<Vec<RemoteAffinityGroup>> {
        let list: AffinityGroupList = self
            .get(&format!("/clusters/{}/affinitygroups", cluster_id), &[])
            .await?;
        Ok(list
            .affinity_group
            .into_iter()
            .map(|g| RemoteAffinityGroup {
                id: g.id,
                name: g.name,
                priority: g.priority,
                enforcing: g.enforcing,
            })
            .collect())
    }

    async fn list_hosts(&self, cluster_name: &str) -> Result<Vec<Host>> {
        let search = cluster_search(cluster_name);
        let list: HostList = self.get("/hosts", &[("search", search.as_str())]).await?;
        Ok(list
            .host
            .into_iter()
            .map(|h| Host {
                id: h.id,
                name: h.name,
                status: h.status,
            })
            .collect())
    }

    async fn get_instance_type(&self, id: &str) -> Result<InstanceType> {
        let wire: IdName = self.get(&format!("/instancetypes/{}", id), &[]).await?;
        Ok(InstanceType {
            id: wire.id,
            name: wire.name,
        })
    }
}

/// `https://engine/ovirt-engine/api` -> `https://engine/ovirt-engine/sso/oauth/{token,revoke}`.
fn sso_urls(api_url: &Url) -> (Url, Url) {
    let path = api_url.path().trim_end_matches('/');
    let base = path.strip_suffix("/api").unwrap_or(path);

    let mut token = api_url.clone();
    token.set_path(&format!("{}/sso/oauth/token", base));
    token.set_query(None);

    let mut revoke = token.clone();
    revoke.set_path(&format!("{}/sso/oauth/revoke", base));

    (token, revoke)
}

/// Engine search expression selecting resources of one cluster.
fn cluster_search(cluster_name: &str) -> String {
    format!("cluster=\"{}\"", cluster_name)
}

fn split_pem_bundle(pem: &str) -> Vec<String> {
    const END: &str = "-----END CERTIFICATE-----";
    pem.split_inclusive(END)
        .map(str::trim)
        .filter(|block| block.contains("-----BEGIN CERTIFICATE-----"))
        .map(str::to_string)
        .collect()
}

// Wire types. The engine renders numbers and booleans as JSON strings, and
// omits a list key entirely when the list is empty.

#[derive(Debug, Deserialize)]
struct SsoResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRoot {
    #[serde(default)]
    product_info: Option<ProductInfo>,
}

#[derive(Debug, Deserialize)]
struct ProductInfo {
    #[serde(default)]
    version: Option<ProductVersion>,
}

#[derive(Debug, Deserialize)]
struct ProductVersion {
    #[serde(default)]
    full_version: String,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct IdName {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ClusterList {
    #[serde(default)]
    cluster: Vec<WireCluster>,
}

#[derive(Debug, Deserialize)]
struct WireCluster {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    data_center: Option<IdRef>,
}

#[derive(Debug, Deserialize)]
struct StorageDomainList {
    #[serde(default)]
    storage_domain: Vec<WireStorageDomain>,
}

#[derive(Debug, Deserialize)]
struct WireStorageDomain {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct NetworkList {
    #[serde(default)]
    network: Vec<IdName>,
}

#[derive(Debug, Deserialize)]
struct VnicProfileList {
    #[serde(default)]
    vnic_profile: Vec<WireVnicProfile>,
}

#[derive(Debug, Deserialize)]
struct WireVnicProfile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    network: Option<IdRef>,
}

#[derive(Debug, Deserialize)]
struct TemplateList {
    #[serde(default)]
    template: Vec<IdName>,
}

#[derive(Debug, Deserialize)]
struct AffinityGroupList {
    #[serde(default)]
    affinity_group: Vec<WireAffinityGroup>,
}

#[derive(Debug, Deserialize)]
struct WireAffinityGroup {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    priority: f64,
    #[serde(default, deserialize_with = "lenient_bool")]
    enforcing: bool,
}

#[derive(Debug, Deserialize)]
struct HostList {
    #[serde(default)]
    host: Vec<WireHost>,
}

#[derive(Debug, Deserialize)]
struct WireHost {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Native(T),
    Text(String),
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    match Lenient::<bool>::deserialize(deserializer)? {
        Lenient::Native(value) => Ok(value),
        Lenient::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    match Lenient::<f64>::deserialize(deserializer)? {
        Lenient::Native(value) => Ok(value),
        Lenient::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
