/*
[INPUT]:  User principals REST payload (camelCase JSON)
[OUTPUT]: Typed streamer connection metadata and account list
[POS]:    Data layer - inputs for the streaming login handshake
[UPDATE]: When the streamer needs more user-principals fields
*/

use serde::{Deserialize, Serialize};

/// Subset of the user principals response used by the streamer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPrincipals {
    #[serde(default)]
    pub user_id: Option<String>,
    pub streamer_info: StreamerInfo,
    #[serde(default)]
    pub accounts: Vec<PrincipalAccount>,
}

/// Streaming connection metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamerInfo {
    /// Host of the streaming endpoint, without scheme or path
    pub streamer_socket_url: String,
    pub token: String,
    /// Token issue time, e.g. `2021-01-01T00:00:00+0000`
    pub token_timestamp: String,
    #[serde(default)]
    pub user_group: String,
    #[serde(default)]
    pub access_level: String,
    #[serde(default)]
    pub acl: String,
    #[serde(default)]
    pub app_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalAccount {
    pub account_id: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub segment: String,
    #[serde(default)]
    pub account_cd_domain_id: String,
}
