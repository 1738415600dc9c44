/*
[INPUT]:  User principals response and selected account index
[OUTPUT]: Credential block for the streaming login request
[POS]:    WebSocket layer - login payload derivation (pure)
[UPDATE]: When the login credential fields change
*/

use chrono::{DateTime, FixedOffset};

use crate::http::{Result, TdaError};
use crate::types::UserPrincipals;

/// Fields of the `credential` login parameter, in wire order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialBlock {
    pub userid: String,
    pub token: String,
    pub company: String,
    pub segment: String,
    pub cddomain: String,
    pub usergroup: String,
    pub accesslevel: String,
    pub authorized: String,
    /// Token issue time in epoch milliseconds
    pub timestamp: i64,
    pub appid: String,
    pub acl: String,
}

impl CredentialBlock {
    pub fn from_principals(principals: &UserPrincipals, account_index: usize) -> Result<Self> {
        let account = principals.accounts.get(account_index).ok_or_else(|| {
            TdaError::InvalidResponse(format!(
                "user principals has no account at index {account_index} ({} accounts)",
                principals.accounts.len()
            ))
        })?;
        let info = &principals.streamer_info;

        Ok(Self {
            userid: account.account_id.clone(),
            token: info.token.clone(),
            company: account.company.clone(),
            segment: account.segment.clone(),
            cddomain: account.account_cd_domain_id.clone(),
            usergroup: info.user_group.clone(),
            accesslevel: info.access_level.clone(),
            authorized: "Y".to_string(),
            timestamp: parse_token_timestamp(&info.token_timestamp)?,
            appid: info.app_id.clone(),
            acl: info.acl.clone(),
        })
    }

    /// Form-encoded `key=value&...` string sent as the `credential` parameter
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("userid", &self.userid)
            .append_pair("token", &self.token)
            .append_pair("company", &self.company)
            .append_pair("segment", &self.segment)
            .append_pair("cddomain", &self.cddomain)
            .append_pair("usergroup", &self.usergroup)
            .append_pair("accesslevel", &self.accesslevel)
            .append_pair("authorized", &self.authorized)
            .append_pair("timestamp", &self.timestamp.to_string())
            .append_pair("appid", &self.appid)
            .append_pair("acl", &self.acl)
            .finish()
    }
}

/// Epoch milliseconds of a token timestamp.
///
/// Accepts RFC 3339 (`2021-01-01T00:00:00Z`) and the `+0000` offset form the
/// user principals endpoint returns (`2021-01-01T00:00:00+0000`).
pub fn parse_token_timestamp(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    let parsed = DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::<FixedOffset>::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map_err(|e| TdaError::InvalidResponse(format!("invalid tokenTimestamp '{raw}': {e}")))?;
    Ok(parsed.timestamp_millis())
}
