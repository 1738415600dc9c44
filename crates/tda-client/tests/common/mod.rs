/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for tda-client tests

#![allow(dead_code)]

use tda_client::{AuthConfig, ClientConfig, PrincipalAccount, StreamerInfo, TdaClient, UserPrincipals};
use wiremock::MockServer;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Client whose API and auth hosts both point at `base_url`
pub fn client_for(base_url: &str) -> TdaClient {
    TdaClient::with_config_and_base_urls(ClientConfig::default(), base_url, base_url)
        .expect("client should build")
}

/// Flow settings that bind an ephemeral loopback port
pub fn ephemeral_auth_config(consumer_key: &str) -> AuthConfig {
    let mut config = AuthConfig::new(consumer_key);
    config.redirect_port = 0;
    config.redirect_timeout_secs = 10;
    config
}

/// Token endpoint response for an authorization-code exchange
pub fn token_response() -> serde_json::Value {
    serde_json::json!({
        "access_token": "access-1",
        "refresh_token": "refresh-1",
        "token_type": "Bearer",
        "expires_in": 1800,
        "scope": "PlaceTrades AccountAccess MoveMoney",
        "refresh_token_expires_in": 7776000
    })
}

/// Principals for a single account whose streamer lives at `streamer_socket_url`
pub fn sample_principals(streamer_socket_url: &str) -> UserPrincipals {
    UserPrincipals {
        user_id: Some("jdoe".to_string()),
        streamer_info: StreamerInfo {
            streamer_socket_url: streamer_socket_url.to_string(),
            token: "streamer-token".to_string(),
            token_timestamp: "2021-01-01T00:00:00Z".to_string(),
            user_group: "ACCT".to_string(),
            access_level: "ACCT".to_string(),
            acl: "AKBPCFDRESGKMAQSTFTOTTUAURXBXNXOQ2NS".to_string(),
            app_id: "MYAPP".to_string(),
        },
        accounts: vec![PrincipalAccount {
            account_id: "123456789".to_string(),
            company: "AMER".to_string(),
            segment: "AMER".to_string(),
            account_cd_domain_id: "A000000012345678".to_string(),
        }],
    }
}
