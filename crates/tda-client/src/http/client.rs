/*
[INPUT]:  HTTP configuration (base URLs, timeouts) and bearer tokens
[OUTPUT]: Configured reqwest client and normalized JSON responses
[POS]:    HTTP layer - core client implementation shared by auth and REST callers
[UPDATE]: When adding connection options or changing response normalization
*/

use reqwest::{Client, Method, RequestBuilder, Url, header};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::http::{Result, TdaError};

/// Base URLs for the TD Ameritrade API
pub const API_BASE_URL: &str = "https://api.tdameritrade.com";
pub const AUTH_BASE_URL: &str = "https://auth.tdameritrade.com";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Main HTTP client for the TD Ameritrade API
#[derive(Debug, Clone)]
pub struct TdaClient {
    http_client: Client,
    api_base_url: Url,
    auth_base_url: Url,
}

impl TdaClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Self::with_config_and_base_urls(config, API_BASE_URL, AUTH_BASE_URL)
    }

    /// Create a client that talks to alternative hosts (tests, proxies)
    pub fn with_config_and_base_urls(
        config: ClientConfig,
        api_base_url: &str,
        auth_base_url: &str,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            api_base_url: Url::parse(api_base_url)?,
            auth_base_url: Url::parse(auth_base_url)?,
        })
    }

    /// Base URL used for REST and token endpoints
    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    /// Build full URL for REST endpoints
    pub fn api_url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.api_base_url.join(endpoint)?)
    }

    /// Build full URL for identity provider endpoints
    pub fn auth_url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.auth_base_url.join(endpoint)?)
    }

    /// Build request builder for REST endpoints
    pub fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.api_url(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    /// Build request builder carrying `Authorization: Bearer <token>`
    pub fn bearer_request(
        &self,
        method: Method,
        endpoint: &str,
        token: &str,
    ) -> Result<RequestBuilder> {
        let builder = self.request(method, endpoint)?;
        Ok(builder.header(header::AUTHORIZATION, format!("Bearer {token}")))
    }

    /// Send a request and decode the JSON body of a 2xx response.
    ///
    /// Non-2xx responses become [`TdaError::Status`] (`"<status>: <reason>"`);
    /// transport failures are returned unchanged as [`TdaError::Http`].
    pub async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "http response received");

        if !status.is_success() {
            return Err(TdaError::from_status(status));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> TdaClient {
        TdaClient::with_config_and_base_urls(ClientConfig::default(), &server.uri(), &server.uri())
            .expect("client init")
    }

    #[tokio::test]
    async fn test_send_json_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/accounts"))
            .and(header("authorization", "Bearer t0k"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "pizza": "pepperoni" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let builder = client
            .bearer_request(Method::GET, "/v1/accounts", "t0k")
            .expect("builder");
        let body: serde_json::Value = client.send_json(builder).await.expect("send_json");

        assert_eq!(body, serde_json::json!({ "pizza": "pepperoni" }));
    }

    #[tokio::test]
    async fn test_send_json_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let builder = client.request(Method::GET, "/v1/missing").expect("builder");
        let err = client
            .send_json::<serde_json::Value>(builder)
            .await
            .expect_err("404 must fail");

        assert_eq!(err.to_string(), "404: Not Found");
    }

    #[tokio::test]
    async fn test_send_json_transport_error() {
        let client = TdaClient::with_config_and_base_urls(
            ClientConfig::default(),
            "http://127.0.0.1:1",
            "http://127.0.0.1:1",
        )
        .expect("client init");

        let builder = client.request(Method::GET, "/v1/accounts").expect("builder");
        let err = client
            .send_json::<serde_json::Value>(builder)
            .await
            .expect_err("connection must be refused");

        assert!(matches!(err, TdaError::Http(_)));
    }
}
