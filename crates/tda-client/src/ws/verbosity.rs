/*
[INPUT]:  Verbosity setting from caller or config (`none`, `debug`, `error`)
[OUTPUT]: Log gating decisions for the streaming session
[POS]:    WebSocket layer - diagnostic knob
[UPDATE]: When adding log levels to the streamer
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::http::TdaError;

/// How much of a streaming session is written to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    #[default]
    None,
    /// Every frame and lifecycle transition
    Debug,
    /// Transport errors only
    Error,
}

impl Verbosity {
    pub fn logs_frames(self) -> bool {
        self == Verbosity::Debug
    }

    pub fn logs_errors(self) -> bool {
        self != Verbosity::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verbosity::None => "none",
            Verbosity::Debug => "debug",
            Verbosity::Error => "error",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verbosity {
    type Err = TdaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Verbosity::None),
            "debug" => Ok(Verbosity::Debug),
            "error" => Ok(Verbosity::Error),
            other => Err(TdaError::Config(format!(
                "unknown verbosity '{other}', expected none, debug or error"
            ))),
        }
    }
}
