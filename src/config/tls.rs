//! TLS material shared by the registry server and its clients.
//!
//! The registry requires mutual TLS: clients present a certificate chaining
//! to the configured root CA, and verify the server against the same root.

use rustls::RootCertStore;
use rustls::server::WebPkiClientVerifier;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TlsError {
    #[error("Unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid PEM in {path}: {message}")]
    Pem { path: PathBuf, message: String },
    #[error("No certificate found in {0}")]
    NoCertificate(PathBuf),
    #[error("Incomplete TLS configuration: {0} is required")]
    Missing(&'static str),
    #[error("Invalid TLS configuration: {0}")]
    Rustls(#[from] rustls::Error),
    #[error("Invalid client certificate verifier: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),
}

/// Paths to the PEM files making up one side of a mutual TLS connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsPaths {
    pub pem_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    pub root_ca_pem: Option<PathBuf>,
}

impl TlsPaths {
    pub fn is_empty(&self) -> bool {
        self.pem_path.is_none() && self.key_path.is_none() && self.root_ca_pem.is_none()
    }

    /// Command line values take precedence over the configuration ones.
    pub fn or(self, other: TlsPaths) -> TlsPaths {
        TlsPaths {
            pem_path: self.pem_path.or(other.pem_path),
            key_path: self.key_path.or(other.key_path),
            root_ca_pem: self.root_ca_pem.or(other.root_ca_pem),
        }
    }

    fn require(&self) -> Result<(&Path, &Path, &Path), TlsError> {
        let pem_path = self
            .pem_path
            .as_deref()
            .ok_or(TlsError::Missing("tls-pem-path"))?;
        let key_path = self
            .key_path
            .as_deref()
            .ok_or(TlsError::Missing("tls-key-path"))?;
        let root_ca_pem = self
            .root_ca_pem
            .as_deref()
            .ok_or(TlsError::Missing("tls-root-ca-pem"))?;
        Ok((pem_path, key_path, root_ca_pem))
    }

    /// Client side material: the identity (certificate followed by its key)
    /// and the root CA, both as PEM bytes.
    pub fn client_material(&self) -> Result<ClientTlsMaterial, TlsError> {
        let (pem_path, key_path, root_ca_pem) = self.require()?;
        let mut identity = read(pem_path)?;
        identity.push(b'\n');
        identity.extend(read(key_path)?);
        Ok(ClientTlsMaterial {
            identity_pem: identity,
            root_ca_pem: read(root_ca_pem)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClientTlsMaterial {
    pub identity_pem: Vec<u8>,
    pub root_ca_pem: Vec<u8>,
}

fn read(path: &Path) -> Result<Vec<u8>, TlsError> {
    std::fs::read(path).map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn pem_error(path: &Path, error: rustls_pki_types::pem::Error) -> TlsError {
    TlsError::Pem {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

pub fn load_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let bytes = read(path)?;
    let certificates = CertificateDer::pem_slice_iter(&bytes)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| pem_error(path, error))?;
    if certificates.is_empty() {
        return Err(TlsError::NoCertificate(path.to_path_buf()));
    }
    Ok(certificates)
}

pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let bytes = read(path)?;
    PrivateKeyDer::from_pem_slice(&bytes).map_err(|error| pem_error(path, error))
}

/// Builds the server configuration: any client certificate chaining to the
/// root CA is accepted, clients without a certificate are refused.
pub fn server_config(paths: &TlsPaths) -> Result<rustls::ServerConfig, TlsError> {
    let (pem_path, key_path, root_ca_pem) = paths.require()?;

    let mut roots = RootCertStore::empty();
    for certificate in load_certificates(root_ca_pem)? {
        roots.add(certificate)?;
    }
    let verifier = WebPkiClientVerifier::builder(Arc::new(roots)).build()?;

    let mut config = rustls::ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(load_certificates(pem_path)?, load_private_key(key_path)?)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_prefers_self() {
        let cli = TlsPaths {
            pem_path: Some(PathBuf::from("cli.pem")),
            ..Default::default()
        };
        let config = TlsPaths {
            pem_path: Some(PathBuf::from("config.pem")),
            key_path: Some(PathBuf::from("config.key")),
            root_ca_pem: None,
        };
        let merged = cli.or(config);
        assert_eq!(merged.pem_path, Some(PathBuf::from("cli.pem")));
        assert_eq!(merged.key_path, Some(PathBuf::from("config.key")));
        assert_eq!(merged.root_ca_pem, None);
        assert!(!merged.is_empty());
        assert!(TlsPaths::default().is_empty());
    }

    #[test]
    fn test_missing_material() {
        let paths = TlsPaths {
            pem_path: Some(PathBuf::from("server.pem")),
            ..Default::default()
        };
        assert!(matches!(
            server_config(&paths),
            Err(TlsError::Missing("tls-key-path"))
        ));
        assert!(matches!(
            paths.client_material(),
            Err(TlsError::Missing("tls-key-path"))
        ));
    }

    #[test]
    fn test_unreadable_file() {
        let directory = tempfile::tempdir().unwrap();
        let missing = directory.path().join("missing.pem");
        assert!(matches!(
            load_certificates(&missing),
            Err(TlsError::Read { .. })
        ));

        let empty = directory.path().join("empty.pem");
        std::fs::write(&empty, "").unwrap();
        assert!(matches!(
            load_certificates(&empty),
            Err(TlsError::NoCertificate(_))
        ));
    }

    #[test]
    fn test_server_config_from_generated_material() {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let directory = tempfile::tempdir().unwrap();

        let ca_key = rcgen::KeyPair::generate().unwrap();
        let mut ca_params = rcgen::CertificateParams::default();
        ca_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        let ca = ca_params.self_signed(&ca_key).unwrap();
        let issuer = rcgen::Issuer::new(ca_params, ca_key);

        let server_key = rcgen::KeyPair::generate().unwrap();
        let server = rcgen::CertificateParams::new(vec!["localhost".to_string()])
            .unwrap()
            .signed_by(&server_key, &issuer)
            .unwrap();

        let paths = TlsPaths {
            pem_path: Some(directory.path().join("server.pem")),
            key_path: Some(directory.path().join("server.key")),
            root_ca_pem: Some(directory.path().join("ca.pem")),
        };
        std::fs::write(paths.pem_path.as_ref().unwrap(), server.pem()).unwrap();
        std::fs::write(paths.key_path.as_ref().unwrap(), server_key.serialize_pem()).unwrap();
        std::fs::write(paths.root_ca_pem.as_ref().unwrap(), ca.pem()).unwrap();

        let config = server_config(&paths).unwrap();
        assert_eq!(config.alpn_protocols[0], b"h2".to_vec());

        let material = paths.client_material().unwrap();
        assert!(
            String::from_utf8(material.identity_pem)
                .unwrap()
                .contains("PRIVATE KEY")
        );
    }
}
