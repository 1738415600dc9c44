/*
[INPUT]:  Public API exports for tda-auth crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;

pub use config::{AuthOverrides, CliConfig};
