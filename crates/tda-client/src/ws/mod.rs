/*
[INPUT]:  User principals and caller streaming requests
[OUTPUT]: Streaming session events and request payloads
[POS]:    WebSocket layer - streaming session
[UPDATE]: When adding request helpers or changing connection logic
*/

pub mod client;
pub mod credentials;
pub mod message;
pub mod verbosity;

pub use client::{Streamer, StreamerOptions, stream_url};
pub use credentials::{CredentialBlock, parse_token_timestamp};
pub use message::{RequestEnvelope, ServiceRequest, StreamEvent, StreamEventKind, login_request};
pub use verbosity::Verbosity;
