/*
[INPUT]:  Credential blocks, caller service commands, inbound frames
[OUTPUT]: Streaming request envelopes and session events
[POS]:    WebSocket layer - message types and login payload
[UPDATE]: When adding request helpers or event kinds
*/

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::TdaError;
use crate::ws::CredentialBlock;

pub(crate) const LOGIN_REQUEST_ID: u64 = 0;
const PROTOCOL_VERSION: &str = "1.0";

/// Event emitted by a streaming session
#[derive(Debug)]
pub enum StreamEvent {
    /// Socket opened and login sent; at most once per session
    Connected,
    /// Parsed JSON body of one inbound frame
    Message(Value),
    /// Transport or frame decoding error
    Error(TdaError),
    /// Socket closed; at most once per session, always the last event
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamEventKind {
    Connected,
    Message,
    Error,
    Disconnected,
}

impl StreamEvent {
    pub fn kind(&self) -> StreamEventKind {
        match self {
            StreamEvent::Connected => StreamEventKind::Connected,
            StreamEvent::Message(_) => StreamEventKind::Message,
            StreamEvent::Error(_) => StreamEventKind::Error,
            StreamEvent::Disconnected => StreamEventKind::Disconnected,
        }
    }
}

/// `{"requests": [...]}` wrapper the streaming endpoint expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub requests: Vec<ServiceRequest>,
}

impl RequestEnvelope {
    pub fn single(request: ServiceRequest) -> Self {
        Self {
            requests: vec![request],
        }
    }
}

/// One service command (`ADMIN/LOGIN`, `QUOTE/SUBS`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub service: String,
    pub command: String,
    pub requestid: u64,
    pub account: String,
    pub source: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl ServiceRequest {
    pub fn new(
        service: impl Into<String>,
        command: impl Into<String>,
        requestid: u64,
        account: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            command: command.into(),
            requestid,
            account: account.into(),
            source: source.into(),
            parameters: Map::new(),
        }
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// The `ADMIN/LOGIN` request sent as the first frame of every session
pub fn login_request(credentials: &CredentialBlock, source: &str) -> RequestEnvelope {
    RequestEnvelope::single(
        ServiceRequest::new(
            "ADMIN",
            "LOGIN",
            LOGIN_REQUEST_ID,
            credentials.userid.clone(),
            source,
        )
        .parameter("credential", credentials.encode())
        .parameter("token", credentials.token.clone())
        .parameter("version", PROTOCOL_VERSION),
    )
}
