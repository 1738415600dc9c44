/*
[INPUT]:  HTTP client, authorization settings, interactive login strategy
[OUTPUT]: Authorization grants and token sets
[POS]:    Auth layer - orchestrates the complete authorization-code flow
[UPDATE]: When auth endpoints or flow steps change
*/

use std::sync::Arc;

use reqwest::Method;
use tracing::{debug, info};
use url::Url;

use crate::auth::tokens::{TOKEN_ENDPOINT, authorization_code_form, refresh_form};
use crate::auth::{
    AuthConfig, BrowserLogin, CallbackServer, Grant, InteractiveLogin, TlsMaterial, TokenSet,
};
use crate::http::{Result, TdaClient};

const AUTHORIZE_ENDPOINT: &str = "/auth";

/// Coordinates consent, redirect capture, and token exchange
pub struct AuthorizationFlow {
    client: TdaClient,
    config: AuthConfig,
    tls: TlsMaterial,
    login: Arc<dyn InteractiveLogin>,
}

impl AuthorizationFlow {
    /// Create a flow that opens the consent page in the default browser.
    ///
    /// TLS material comes from the configured paths, else the bundled pair.
    pub fn new(client: TdaClient, config: AuthConfig) -> Result<Self> {
        config.validate()?;
        let tls = TlsMaterial::from_config(&config)?;
        Ok(Self {
            client,
            config,
            tls,
            login: Arc::new(BrowserLogin),
        })
    }

    /// Replace the interactive login strategy
    pub fn with_login(mut self, login: impl InteractiveLogin + 'static) -> Self {
        self.login = Arc::new(login);
        self
    }

    /// Replace the listener's TLS material
    pub fn with_tls(mut self, tls: TlsMaterial) -> Self {
        self.tls = tls;
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Consent page URL for a listener on `redirect_port`
    pub fn authorization_url(&self, redirect_port: u16) -> Result<Url> {
        let mut url = self.client.auth_url(AUTHORIZE_ENDPOINT)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id())
            .append_pair("response_type", "code")
            .append_pair(
                "redirect_uri",
                &self.config.redirect_uri_for_port(redirect_port),
            );
        Ok(url)
    }

    /// Bind the redirect listener on the configured address.
    ///
    /// A loopback address behind a `localhost` redirect host also gets the
    /// other IP family's loopback on the same port.
    pub async fn start_listener(&self) -> Result<CallbackServer> {
        let addr = self.config.bind_socket_addr();
        if addr.ip().is_loopback() && self.config.redirect_host == "localhost" {
            CallbackServer::bind_loopback(addr, &self.tls).await
        } else {
            CallbackServer::bind(addr, &self.tls).await
        }
    }

    /// Run consent and wait for the redirect carrying the grant
    pub async fn authenticate(&self) -> Result<Grant> {
        let server = self.start_listener().await?;
        let redirect_port = server.local_addr().port();
        let url = self.authorization_url(redirect_port)?;

        self.login.begin(&url, self.config.login.as_ref()).await?;

        let grant = server
            .wait_for_grant(self.config.redirect_timeout())
            .await?
            .with_redirect_uri(self.config.redirect_uri_for_port(redirect_port));
        info!("authorization grant captured");
        Ok(grant)
    }

    /// Exchange a grant for access and refresh tokens
    ///
    /// POST /v1/oauth2/token (grant_type=authorization_code)
    ///
    /// Sends the redirect URI the grant was issued for, falling back to the
    /// configured one for grants captured elsewhere.
    pub async fn generate_tokens(&self, grant: &Grant) -> Result<TokenSet> {
        let redirect_uri = grant
            .redirect_uri()
            .map(str::to_string)
            .unwrap_or_else(|| self.config.redirect_uri());
        let form = authorization_code_form(&self.config.client_id(), &redirect_uri, grant.as_str());
        debug!("exchanging authorization grant");
        self.post_token_form(&form).await
    }

    /// Get a fresh access token
    ///
    /// POST /v1/oauth2/token (grant_type=refresh_token)
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet> {
        let form = refresh_form(&self.config.client_id(), refresh_token, false);
        debug!("refreshing access token");
        self.post_token_form(&form).await
    }

    /// Like [`Self::refresh_token`], but also asks for a new refresh token
    pub async fn refresh_token_offline(&self, refresh_token: &str) -> Result<TokenSet> {
        let form = refresh_form(&self.config.client_id(), refresh_token, true);
        debug!("refreshing access and refresh tokens");
        self.post_token_form(&form).await
    }

    /// Consent, redirect capture, and code exchange in one call
    pub async fn authenticate_and_exchange(&self) -> Result<TokenSet> {
        let grant = self.authenticate().await?;
        self.generate_tokens(&grant).await
    }

    async fn post_token_form(&self, form: &[(&'static str, String)]) -> Result<TokenSet> {
        let builder = self.client.request(Method::POST, TOKEN_ENDPOINT)?.form(form);
        self.client.send_json(builder).await
    }
}

impl std::fmt::Debug for AuthorizationFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationFlow")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("tls", &self.tls)
            .finish_non_exhaustive()
    }
}
