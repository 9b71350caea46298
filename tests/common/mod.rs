#![allow(dead_code)]

use indicator_registry::config::load_configuration_for_tests;
use indicator_registry::config::tls::TlsPaths;
use indicator_registry::http::server::{RegistryServer, ServerHandle};
use indicator_registry::test_utils::TestRegistry;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, Issuer, KeyPair,
};
use std::net::SocketAddr;
use std::sync::Once;
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Loads the configuration and installs the crypto provider, once per test
/// binary.
pub fn ensure_config() {
    INIT.call_once(|| {
        load_configuration_for_tests().expect("Failed to load configuration for tests");
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

/// Starts a registry on an ephemeral port and returns its address.
pub async fn spawn_registry(
    registry: &TestRegistry,
    tls: Option<rustls::ServerConfig>,
) -> (SocketAddr, ServerHandle) {
    let server = RegistryServer::new(
        registry.state.clone(),
        SocketAddr::from(([127, 0, 0, 1], 0)),
        tls,
    )
    .expect("Failed to build registry server");
    let handle = server.handle();
    tokio::spawn(server.serve());
    let address = handle
        .listening()
        .await
        .expect("Registry server did not start");
    (address, handle)
}

/// Ephemeral CA with one server and one client certificate, written to a
/// temporary directory.
pub struct TlsFixtures {
    _directory: TempDir,
    pub server: TlsPaths,
    pub client: TlsPaths,
}

fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut name = DistinguishedName::new();
    name.push(DnType::CommonName, common_name);
    name
}

pub fn generate_tls_fixtures() -> TlsFixtures {
    let directory = tempfile::Builder::new()
        .prefix("registry-tls")
        .tempdir()
        .unwrap();
    let path = |name: &str| directory.path().join(name);

    let ca_key = KeyPair::generate().unwrap();
    let mut ca_params = CertificateParams::default();
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params.distinguished_name = distinguished_name("Indicator Registry Test CA");
    let ca = ca_params.self_signed(&ca_key).unwrap();
    let issuer = Issuer::new(ca_params, ca_key);

    let server_key = KeyPair::generate().unwrap();
    let mut server_params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    server_params.distinguished_name = distinguished_name("localhost");
    let server = server_params.signed_by(&server_key, &issuer).unwrap();

    let client_key = KeyPair::generate().unwrap();
    let mut client_params = CertificateParams::default();
    client_params.distinguished_name = distinguished_name("registry-client");
    let client = client_params.signed_by(&client_key, &issuer).unwrap();

    std::fs::write(path("ca.pem"), ca.pem()).unwrap();
    std::fs::write(path("server.pem"), server.pem()).unwrap();
    std::fs::write(path("server.key"), server_key.serialize_pem()).unwrap();
    std::fs::write(path("client.pem"), client.pem()).unwrap();
    std::fs::write(path("client.key"), client_key.serialize_pem()).unwrap();

    TlsFixtures {
        server: TlsPaths {
            pem_path: Some(path("server.pem")),
            key_path: Some(path("server.key")),
            root_ca_pem: Some(path("ca.pem")),
        },
        client: TlsPaths {
            pem_path: Some(path("client.pem")),
            key_path: Some(path("client.key")),
            root_ca_pem: Some(path("ca.pem")),
        },
        _directory: directory,
    }
}
