/*
[INPUT]:  Token endpoint JSON responses, grant codes, refresh tokens
[OUTPUT]: TokenSet values and form bodies for the token endpoint
[POS]:    Auth layer - OAuth token payloads
[UPDATE]: When token endpoint fields or grant parameters change
*/

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub(crate) const TOKEN_ENDPOINT: &str = "/v1/oauth2/token";

/// Access/refresh token pair plus expiry metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    /// Absent on refresh responses that do not rotate the refresh token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_expires_in: Option<u64>,
}

impl TokenSet {
    /// Absolute access token expiry for a response received at `issued_at`
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + Duration::seconds(self.expires_in as i64)
    }

    pub fn refresh_token_expires_at(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.refresh_token_expires_in
            .map(|secs| issued_at + Duration::seconds(secs as i64))
    }
}

pub(crate) fn authorization_code_form(
    client_id: &str,
    redirect_uri: &str,
    code: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("grant_type", "authorization_code".to_string()),
        ("access_type", "offline".to_string()),
        ("client_id", client_id.to_string()),
        ("redirect_uri", redirect_uri.to_string()),
        ("code", code.to_string()),
    ]
}

pub(crate) fn refresh_form(
    client_id: &str,
    refresh_token: &str,
    offline: bool,
) -> Vec<(&'static str, String)> {
    let mut form = vec![("grant_type", "refresh_token".to_string())];
    if offline {
        form.push(("access_type", "offline".to_string()));
    }
    form.push(("client_id", client_id.to_string()));
    form.push(("refresh_token", refresh_token.to_string()));
    form
}
