/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public TD Ameritrade client crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod callback;
pub mod http;
pub mod types;
pub mod ws;

// Re-export commonly used types from auth
pub use auth::{
    AuthConfig,
    AuthorizationFlow,
    BrowserLogin,
    CallbackServer,
    Grant,
    InteractiveLogin,
    LoginCredentials,
    ManualLogin,
    TlsMaterial,
    TokenSet,
};

pub use callback::{spawn_with_callback, with_callback};

// Re-export commonly used types from http
pub use http::{
    ClientConfig,
    Result,
    TdaClient,
    TdaError,
};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{
    RequestEnvelope,
    ServiceRequest,
    StreamEvent,
    StreamEventKind,
    Streamer,
    StreamerOptions,
    Verbosity,
};
