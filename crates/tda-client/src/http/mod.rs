/*
[INPUT]:  HTTP client configuration and API endpoints
[OUTPUT]: Normalized JSON responses and errors
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new client options or changing error normalization
*/

pub mod client;
pub mod error;

pub use error::{Result, TdaError};

pub use client::{API_BASE_URL, AUTH_BASE_URL, ClientConfig, TdaClient};
