use crate::config::tls::ClientTlsMaterial;
use crate::datamodel::{IndicatorDocument, StatusUpdate};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity, Response};
use serde::Deserialize;
use std::net::ToSocketAddrs;
use std::time::Duration;
use url::Url;

pub const REGISTRY_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of indicator documents, usually the registry.
#[async_trait]
pub trait DocumentGetter: Send + Sync {
    async fn indicator_documents(&self) -> Result<Vec<IndicatorDocument>>;
}

/// Target of the registration agent.
#[async_trait]
pub trait DocumentRegistrar: Send + Sync {
    async fn register(&self, document: &IndicatorDocument) -> Result<()>;
}

/// Sink for the statuses computed by the status controller.
#[async_trait]
pub trait StatusUpdater: Send + Sync {
    async fn bulk_status_update(&self, updates: &[StatusUpdate], uid: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ErrorsBody {
    errors: Vec<String>,
}

/// HTTP client of the registry API.
///
/// Connections are not kept alive between requests, each call opens a new
/// one.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: Url,
}

impl RegistryClient {
    pub fn new(registry: &str) -> Result<Self> {
        Self::with_tls(registry, None, None)
    }

    /// `server_cn` overrides the name the server certificate is verified
    /// against, while still connecting to the host of `registry`.
    pub fn with_tls(
        registry: &str,
        tls: Option<&ClientTlsMaterial>,
        server_cn: Option<&str>,
    ) -> Result<Self> {
        let mut base_url =
            Url::parse(registry).with_context(|| format!("Invalid registry URL {}", registry))?;

        let mut builder = Client::builder()
            .timeout(REGISTRY_CLIENT_TIMEOUT)
            .pool_max_idle_per_host(0)
            .use_rustls_tls();

        if let Some(tls) = tls {
            let root = Certificate::from_pem(&tls.root_ca_pem).context("Invalid root CA")?;
            let identity =
                Identity::from_pem(&tls.identity_pem).context("Invalid client certificate")?;
            builder = builder
                .tls_built_in_root_certs(false)
                .add_root_certificate(root)
                .identity(identity);
        }

        if let Some(server_cn) = server_cn {
            let host = base_url
                .host_str()
                .ok_or_else(|| anyhow!("Registry URL {} has no host", registry))?
                .to_string();
            let port = base_url
                .port_or_known_default()
                .ok_or_else(|| anyhow!("Registry URL {} has no port", registry))?;
            let addresses: Vec<_> = (host.as_str(), port)
                .to_socket_addrs()
                .with_context(|| format!("Unable to resolve {}", host))?
                .collect();
            builder = builder.resolve_to_addrs(server_cn, &addresses);
            base_url
                .set_host(Some(server_cn))
                .with_context(|| format!("Invalid server name {}", server_cn))?;
        }

        Ok(Self {
            client: builder.build().context("Unable to build the registry client")?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Registry URL {} cannot be a base", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorsBody>(&body) {
        Ok(errors) => bail!(
            "Registry responded with {}: {}",
            status,
            errors.errors.join(", ")
        ),
        Err(_) => bail!("Registry responded with {}: {}", status, body.trim()),
    }
}

#[async_trait]
impl DocumentRegistrar for RegistryClient {
    async fn register(&self, document: &IndicatorDocument) -> Result<()> {
        let response = self
            .client
            .post(self.url(&["v1", "register"])?)
            .json(document)
            .send()
            .await
            .context("Unable to reach the registry")?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentGetter for RegistryClient {
    async fn indicator_documents(&self) -> Result<Vec<IndicatorDocument>> {
        let response = self
            .client
            .get(self.url(&["v1", "indicator-documents"])?)
            .send()
            .await
            .context("Unable to reach the registry")?;
        check_status(response)
            .await?
            .json()
            .await
            .context("Unable to decode the indicator documents")
    }
}

#[async_trait]
impl StatusUpdater for RegistryClient {
    async fn bulk_status_update(&self, updates: &[StatusUpdate], uid: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(&["v1", "indicator-documents", uid, "bulk_status"])?)
            .json(updates)
            .send()
            .await
            .context("Unable to reach the registry")?;
        check_status(response).await?;
        Ok(())
    }
}
