/*
[INPUT]:  YAML configuration file and command-line overrides
[OUTPUT]: Resolved authorization settings and API hosts
[POS]:    Configuration layer - CLI setup
[UPDATE]: When adding new configuration options
*/

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tda_client::{AuthConfig, ClientConfig, TdaClient};

/// Top-level configuration for the authorization CLI
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    /// Consumer key, redirect listener, and TLS settings
    pub auth: AuthConfig,
    /// REST and token endpoint host
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Consent page host
    #[serde(default)]
    pub auth_base_url: Option<String>,
}

/// Values given on the command line; each replaces the file setting
#[derive(Debug, Clone, Default)]
pub struct AuthOverrides {
    pub consumer_key: Option<String>,
    pub redirect_port: Option<u16>,
    pub tls_key_path: Option<PathBuf>,
    pub tls_cert_path: Option<PathBuf>,
    pub redirect_timeout_secs: Option<u64>,
}

impl CliConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// File settings (if any) with command-line overrides applied
    pub fn resolve(file: Option<Self>, overrides: AuthOverrides) -> Self {
        let mut config = file.unwrap_or_else(|| Self {
            auth: AuthConfig::new(""),
            api_base_url: None,
            auth_base_url: None,
        });

        if let Some(key) = overrides.consumer_key {
            config.auth.consumer_key = key;
        }
        if let Some(port) = overrides.redirect_port {
            config.auth.redirect_port = port;
        }
        if let Some(path) = overrides.tls_key_path {
            config.auth.tls_key_path = Some(path);
        }
        if let Some(path) = overrides.tls_cert_path {
            config.auth.tls_cert_path = Some(path);
        }
        if let Some(secs) = overrides.redirect_timeout_secs {
            config.auth.redirect_timeout_secs = secs;
        }
        config
    }

    /// HTTP client for the configured hosts
    pub fn client(&self) -> tda_client::Result<TdaClient> {
        match (&self.api_base_url, &self.auth_base_url) {
            (None, None) => TdaClient::new(),
            (api, auth) => TdaClient::with_config_and_base_urls(
                ClientConfig::default(),
                api.as_deref().unwrap_or(tda_client::http::API_BASE_URL),
                auth.as_deref().unwrap_or(tda_client::http::AUTH_BASE_URL),
            ),
        }
    }
}
