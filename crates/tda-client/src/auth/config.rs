/*
[INPUT]:  Consumer key, redirect listener settings, optional TLS paths and login credentials
[OUTPUT]: Validated authorization settings (client id, redirect URI, timeouts)
[POS]:    Auth layer - configuration for one OAuth application
[UPDATE]: When adding redirect or listener options
*/

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::{Result, TdaError};

/// Suffix the identity provider expects on every consumer key
pub const CLIENT_ID_SUFFIX: &str = "@AMER.OAUTHAP";

const DEFAULT_REDIRECT_PORT: u16 = 8443;
const DEFAULT_REDIRECT_TIMEOUT_SECS: u64 = 300;

/// Settings for the authorization-code flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Consumer key issued for the calling application
    pub consumer_key: String,
    /// Host used in the redirect URI registered with the application
    #[serde(default = "default_redirect_host")]
    pub redirect_host: String,
    /// Local address the callback listener binds
    #[serde(default = "default_bind_addr")]
    pub bind_addr: IpAddr,
    /// Port of the callback listener and redirect URI
    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,
    /// PEM private key for the callback listener (bundled key when absent)
    #[serde(default)]
    pub tls_key_path: Option<PathBuf>,
    /// PEM certificate chain for the callback listener
    #[serde(default)]
    pub tls_cert_path: Option<PathBuf>,
    /// Seconds to wait for the browser redirect; 0 waits forever
    #[serde(default = "default_redirect_timeout_secs")]
    pub redirect_timeout_secs: u64,
    /// Credentials handed to scripted login implementations
    #[serde(default)]
    pub login: Option<LoginCredentials>,
}

/// Username/password pair for scripted login flows
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AuthConfig {
    /// Default settings for a consumer key
    pub fn new(consumer_key: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            redirect_host: default_redirect_host(),
            bind_addr: default_bind_addr(),
            redirect_port: default_redirect_port(),
            tls_key_path: None,
            tls_cert_path: None,
            redirect_timeout_secs: default_redirect_timeout_secs(),
            login: None,
        }
    }

    /// Reject settings the flow cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.consumer_key.trim().is_empty() {
            return Err(TdaError::Config("consumer key is required".to_string()));
        }
        if self.tls_key_path.is_some() != self.tls_cert_path.is_some() {
            return Err(TdaError::Config(
                "tls_key_path and tls_cert_path must be set together".to_string(),
            ));
        }
        Ok(())
    }

    /// `<consumerKey>@AMER.OAUTHAP`
    pub fn client_id(&self) -> String {
        format!("{}{CLIENT_ID_SUFFIX}", self.consumer_key.trim())
    }

    /// Redirect URI for the configured port
    pub fn redirect_uri(&self) -> String {
        self.redirect_uri_for_port(self.redirect_port)
    }

    pub(crate) fn redirect_uri_for_port(&self, port: u16) -> String {
        format!("https://{}:{port}", self.redirect_host)
    }

    /// Socket address of the callback listener
    pub fn bind_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.redirect_port)
    }

    /// Redirect wait limit, `None` when disabled
    pub fn redirect_timeout(&self) -> Option<Duration> {
        match self.redirect_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn default_redirect_host() -> String {
    "localhost".to_string()
}

fn default_bind_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_redirect_port() -> u16 {
    DEFAULT_REDIRECT_PORT
}

fn default_redirect_timeout_secs() -> u64 {
    DEFAULT_REDIRECT_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::new("ABC123");
        assert_eq!(config.client_id(), "ABC123@AMER.OAUTHAP");
        assert_eq!(config.redirect_uri(), "https://localhost:8443");
        assert_eq!(config.bind_socket_addr().to_string(), "127.0.0.1:8443");
        assert_eq!(config.redirect_timeout(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_zero_timeout_disables_limit() {
        let mut config = AuthConfig::new("ABC123");
        config.redirect_timeout_secs = 0;
        assert_eq!(config.redirect_timeout(), None);
    }

    #[test]
    fn test_validate_rejects_empty_key() {
        let err = AuthConfig::new("  ").validate().unwrap_err();
        assert!(err.to_string().contains("consumer key is required"));
    }

    #[test]
    fn test_validate_rejects_half_tls_pair() {
        let mut config = AuthConfig::new("ABC123");
        config.tls_key_path = Some(PathBuf::from("key.pem"));
        assert!(matches!(config.validate(), Err(TdaError::Config(_))));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: AuthConfig =
            serde_json::from_value(serde_json::json!({ "consumer_key": "ABC123" })).unwrap();
        assert_eq!(config, AuthConfig::new("ABC123"));
    }

    #[test]
    fn test_login_credentials_debug_redacts_password() {
        let creds = LoginCredentials {
            username: "jdoe".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("jdoe"));
        assert!(!rendered.contains("hunter2"));
    }
}
