use anyhow::Error;
use confique::Config;
use std::{
    net::IpAddr,
    path::PathBuf,
    sync::{Arc, OnceLock},
    time::Duration,
};

pub mod interval;
pub mod tls;

pub use interval::parse_interval;

#[derive(Debug, Config)]
pub struct RegistryConfig {
    #[config(env = "INDICATOR_REGISTRY_PORT", default = 10568)]
    pub port: u16,
    #[config(env = "INDICATOR_REGISTRY_ENDPOINT", default = "127.0.0.1")]
    pub endpoint: IpAddr,

    #[config(env = "INDICATOR_REGISTRY_HTTP_BODY_LIMIT", default = "10mb")]
    pub http_body_limit: String,

    #[config(env = "INDICATOR_REGISTRY_HTTP_SERVER_TIMEOUT_SECONDS", default = 30)]
    pub http_server_timeout_seconds: u64,

    /// Documents not registered again within this delay are dropped.
    #[config(env = "INDICATOR_REGISTRY_DOCUMENT_TTL_SECONDS", default = 7200)]
    pub document_ttl_seconds: u64,

    #[config(env = "INDICATOR_REGISTRY_SENTRY_DSN")]
    pub sentry_dsn: Option<String>,

    #[config(env = "INDICATOR_REGISTRY_TLS_PEM_PATH")]
    pub tls_pem_path: Option<PathBuf>,

    #[config(env = "INDICATOR_REGISTRY_TLS_KEY_PATH")]
    pub tls_key_path: Option<PathBuf>,

    #[config(env = "INDICATOR_REGISTRY_TLS_ROOT_CA_PEM")]
    pub tls_root_ca_pem: Option<PathBuf>,
}

impl RegistryConfig {
    pub fn load() -> Result<RegistryConfig, Error> {
        let c = RegistryConfig::builder()
            .env()
            .file("settings.toml")
            .load()?;

        Ok(c)
    }

    pub fn parse_http_body_limit(&self) -> Result<usize, Error> {
        let size = byte_unit::Byte::parse_str(self.http_body_limit.clone(), true)?.as_u64();
        if size > 1024 * 1024 * 1024 {
            anyhow::bail!("Body size is too big: > 1GB");
        }
        Ok(size as usize)
    }

    pub fn document_ttl(&self) -> Result<chrono::Duration, Error> {
        if self.document_ttl_seconds == 0 {
            anyhow::bail!("Document TTL must be greater than zero");
        }
        let seconds = i64::try_from(self.document_ttl_seconds)?;
        chrono::Duration::try_seconds(seconds)
            .ok_or_else(|| Error::msg("Document TTL is out of range"))
    }

    pub fn http_server_timeout(&self) -> Duration {
        Duration::from_secs(self.http_server_timeout_seconds)
    }
}

pub static REGISTRY_CONFIG: OnceLock<Arc<RegistryConfig>> = OnceLock::new();

pub fn get() -> Result<Arc<RegistryConfig>, Error> {
    REGISTRY_CONFIG.get().cloned().ok_or_else(|| {
        Error::msg(
            "Configuration not loaded. Please call load_configuration() before using the configuration",
        )
    })
}

pub fn load_configuration() -> Result<(), Error> {
    // Check if the configuration has already been loaded
    if REGISTRY_CONFIG.get().is_some() {
        return Ok(());
    }

    let config = RegistryConfig::load()?;
    REGISTRY_CONFIG.get_or_init(|| Arc::new(config));

    Ok(())
}

use std::sync::Mutex;

// Used by integration tests - must be always available for test compilation
#[allow(dead_code)]
static TEST_CONFIG_INIT: Mutex<()> = Mutex::new(());

/// Test-only function to ensure configuration is loaded exactly once per test run
#[allow(dead_code)]
pub fn load_configuration_for_tests() -> Result<(), Error> {
    let _guard = TEST_CONFIG_INIT
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    if REGISTRY_CONFIG.get().is_some() {
        return Ok(());
    }

    let config = RegistryConfig::load()?;
    REGISTRY_CONFIG.get_or_init(|| Arc::new(config));

    Ok(())
}
