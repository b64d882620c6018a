use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeedtestError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config parsing error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("{0} is invalid server id")]
    InvalidServerId(String),

    #[error("Speedtest exited with status {code:?}")]
    NonZeroExit { code: Option<i32> },

    #[error("Speedtest did not finish within {0} seconds")]
    Timeout(u64),

    #[error("Unexpected speedtest output: {0}")]
    Malformed(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),
}

impl SpeedtestError {
    /// Collapse the error into the JSON document handed back to the caller.
    /// `token` is the raw positional argument of this invocation.
    pub fn to_payload(&self, token: &str) -> Value {
        match self {
            SpeedtestError::Io(_) => json!({
                "version": "none",
                "message": "No speedtest package installed",
            }),
            SpeedtestError::NonZeroExit { .. } => json!({
                "error": format!("Speedtest server id {} not recognized.", token),
            }),
            other => json!({ "error": other.to_string() }),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpeedtestError>;
