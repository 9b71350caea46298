use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{Level, event};
use url::Url;

/// Effect triggered after a successful export.
#[async_trait]
pub trait Reloader: Send + Sync {
    async fn reload(&self) -> Result<()>;
}

/// Asks Prometheus to reload its configuration and rule files.
///
/// Prometheus must run with `--web.enable-lifecycle`.
#[derive(Debug, Clone)]
pub struct PrometheusReloader {
    client: Client,
    reload_url: Url,
}

impl PrometheusReloader {
    pub fn new(prometheus: &str) -> Result<Self> {
        let mut reload_url = Url::parse(prometheus)
            .with_context(|| format!("Invalid Prometheus URL {}", prometheus))?;
        reload_url
            .path_segments_mut()
            .map_err(|_| anyhow!("Prometheus URL {} cannot be a base", prometheus))?
            .pop_if_empty()
            .extend(["-", "reload"]);

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .use_rustls_tls()
            .build()
            .context("Unable to build the Prometheus client")?;

        Ok(Self { client, reload_url })
    }

    pub fn reload_url(&self) -> &Url {
        &self.reload_url
    }
}

#[async_trait]
impl Reloader for PrometheusReloader {
    async fn reload(&self) -> Result<()> {
        let response = self
            .client
            .post(self.reload_url.clone())
            .send()
            .await
            .context("Unable to reach Prometheus")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Prometheus reload responded with {}: {}", status, body.trim());
        }
        event!(Level::DEBUG, "Prometheus configuration reloaded");
        Ok(())
    }
}
