/*
[INPUT]:  PEM key/certificate bytes or file paths
[OUTPUT]: rustls server configuration for the callback listener
[POS]:    Auth layer - TLS material for the local redirect endpoint
[UPDATE]: When changing certificate loading or TLS provider selection
*/

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rustls::ServerConfig;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use crate::auth::AuthConfig;
use crate::http::{Result, TdaError};

const BUNDLED_KEY_PEM: &[u8] = include_bytes!("../../certs/key.pem");
const BUNDLED_CERT_PEM: &[u8] = include_bytes!("../../certs/cert.pem");

/// PEM-encoded key and certificate chain served by the callback listener
#[derive(Clone)]
pub struct TlsMaterial {
    key_pem: Vec<u8>,
    cert_pem: Vec<u8>,
}

impl TlsMaterial {
    /// Self-signed `localhost` pair shipped with the crate
    pub fn bundled() -> Self {
        Self::from_pem(BUNDLED_KEY_PEM, BUNDLED_CERT_PEM)
    }

    pub fn from_pem(key_pem: impl Into<Vec<u8>>, cert_pem: impl Into<Vec<u8>>) -> Self {
        Self {
            key_pem: key_pem.into(),
            cert_pem: cert_pem.into(),
        }
    }

    /// Read a key/certificate pair from disk
    pub fn from_files(key_path: impl AsRef<Path>, cert_path: impl AsRef<Path>) -> Result<Self> {
        let key_path = key_path.as_ref();
        let cert_path = cert_path.as_ref();
        let key_pem = std::fs::read(key_path).map_err(|e| {
            TdaError::Tls(format!("failed to read key {}: {e}", key_path.display()))
        })?;
        let cert_pem = std::fs::read(cert_path).map_err(|e| {
            TdaError::Tls(format!("failed to read certificate {}: {e}", cert_path.display()))
        })?;
        Ok(Self { key_pem, cert_pem })
    }

    /// Explicit paths from the config, else the bundled pair
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        match (&config.tls_key_path, &config.tls_cert_path) {
            (Some(key), Some(cert)) => Self::from_files(key, cert),
            (None, None) => Ok(Self::bundled()),
            _ => Err(TdaError::Config(
                "tls_key_path and tls_cert_path must be set together".to_string(),
            )),
        }
    }

    pub(crate) fn server_config(&self) -> Result<Arc<ServerConfig>> {
        let certs = CertificateDer::pem_slice_iter(&self.cert_pem)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TdaError::Tls(format!("invalid certificate PEM: {e}")))?;
        if certs.is_empty() {
            return Err(TdaError::Tls("certificate PEM contains no certificate".to_string()));
        }

        let key = PrivateKeyDer::from_pem_slice(&self.key_pem)
            .map_err(|e| TdaError::Tls(format!("invalid private key PEM: {e}")))?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| TdaError::Tls(e.to_string()))?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| TdaError::Tls(e.to_string()))?;

        Ok(Arc::new(config))
    }
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("key_pem", &format_args!("<{} bytes>", self.key_pem.len()))
            .field("cert_pem", &format_args!("<{} bytes>", self.cert_pem.len()))
            .finish()
    }
}
