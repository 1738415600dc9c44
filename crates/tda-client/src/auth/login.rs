/*
[INPUT]:  Authorization URL and optional login credentials
[OUTPUT]: User-agent navigation to the consent page
[POS]:    Auth layer - pluggable interactive login step
[UPDATE]: When adding login strategies (scripted browsers, device prompts)
*/

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::auth::LoginCredentials;
use crate::http::{Result, TdaError};

/// Drives the user agent to the consent page.
///
/// Called after the callback listener is bound, so the redirect cannot
/// arrive before anything is listening for it. Implementations return once
/// the user agent has been pointed at the URL; the grant is collected by
/// the listener.
#[async_trait]
pub trait InteractiveLogin: Send + Sync {
    async fn begin(&self, authorization_url: &Url, credentials: Option<&LoginCredentials>)
    -> Result<()>;
}

/// Opens the consent page in the default browser
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserLogin;

#[async_trait]
impl InteractiveLogin for BrowserLogin {
    async fn begin(
        &self,
        authorization_url: &Url,
        credentials: Option<&LoginCredentials>,
    ) -> Result<()> {
        if credentials.is_some() {
            debug!("browser login ignores configured credentials");
        }
        info!("opening authorization page in default browser");
        open::that_detached(authorization_url.as_str())
            .map_err(|e| TdaError::Browser(e.to_string()))
    }
}

/// Prints the consent page URL for the operator to open by hand
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualLogin;

#[async_trait]
impl InteractiveLogin for ManualLogin {
    async fn begin(
        &self,
        authorization_url: &Url,
        _credentials: Option<&LoginCredentials>,
    ) -> Result<()> {
        info!(url = %authorization_url, "waiting for manual authorization");
        eprintln!("Open this URL in a browser to authorize the application:\n\n  {authorization_url}\n");
        Ok(())
    }
}
