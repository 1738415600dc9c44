/*
[INPUT]:  Consumer key, redirect listener settings, TLS material
[OUTPUT]: Authorization grants and OAuth token sets
[POS]:    Auth layer - OAuth authorization-code flow
[UPDATE]: When auth flow steps or login strategies change
*/

pub mod callback_server;
pub mod config;
pub mod flow;
pub mod login;
pub mod tls;
pub mod tokens;

pub use callback_server::{CallbackServer, Grant};
pub use config::{AuthConfig, CLIENT_ID_SUFFIX, LoginCredentials};
pub use flow::AuthorizationFlow;
pub use login::{BrowserLogin, InteractiveLogin, ManualLogin};
pub use tls::TlsMaterial;
pub use tokens::TokenSet;
