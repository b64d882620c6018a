use serde::{Deserialize, Serialize};
use crate::error::{Result, SpeedtestError};
use std::fmt;

/// Server identifier as reported by the binary.
/// The full dialect emits a number, the legacy dialect a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerId {
    Number(u64),
    Text(String),
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerId::Number(n) => write!(f, "{}", n),
            ServerId::Text(s) => f.write_str(s),
        }
    }
}

/// Canonical, dialect independent result of one speed test run.
/// Field order is the order of the JSON object returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub timestamp: String, // ISO-8601 UTC, always ends in "Z"
    #[serde(rename = "clientip")]
    pub client_ip: String,
    #[serde(rename = "serverid")]
    pub server_id: ServerId,
    #[serde(rename = "servername")]
    pub server_name: String,
    pub country: String,
    pub latency: f64,  // ms
    pub download: f64, // Mbps
    pub upload: f64,   // Mbps
    pub link: String,
}

/// One row of the log file, in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: f64, // epoch seconds
    #[serde(rename = "ClientIp")]
    pub client_ip: String,
    #[serde(rename = "ServerId")]
    pub server_id: String,
    #[serde(rename = "ServerName")]
    pub server_name: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "DlSpeed")]
    pub download: f64,
    #[serde(rename = "UlSpeed")]
    pub upload: f64,
    #[serde(rename = "Latency")]
    pub latency: f64,
    #[serde(rename = "Link")]
    pub link: String,
}

pub const LOG_HEADER: [&str; 9] = [
    "Timestamp",
    "ClientIp",
    "ServerId",
    "ServerName",
    "Country",
    "DlSpeed",
    "UlSpeed",
    "Latency",
    "Link",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerListEntry {
    pub id: String,
    pub name: String,
    pub location: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionInfo {
    pub version: &'static str, // "binary" or "cli"
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Period {
    pub oldest: String,
    pub youngest: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub samples: usize,
    pub period: Period,
    pub latency: Summary,
    pub download: Summary,
    pub upload: Summary,
}

/// Which server the run should use.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerSelection {
    Auto,
    Pinned(String),
}

/// What a single invocation does, decided from the positional argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Log,
    Stat,
    Version,
    List,
    Run(ServerSelection),
}

impl Mode {
    /// Map the single positional token to a mode.
    /// Integer tokens are passed to the binary verbatim, so "007" pins server "007".
    pub fn parse(token: &str) -> Result<Mode> {
        let mode = match token {
            "l" | "log" => Mode::Log,
            "s" | "stat" => Mode::Stat,
            "v" | "version" => Mode::Version,
            "t" | "list" => Mode::List,
            "" | "0" => Mode::Run(ServerSelection::Auto),
            other if is_integer(other) => Mode::Run(ServerSelection::Pinned(other.to_string())),
            other => return Err(SpeedtestError::InvalidServerId(other.to_string())),
        };
        Ok(mode)
    }
}

/// Optional surrounding whitespace, optional sign, then at least one digit.
fn is_integer(token: &str) -> bool {
    let trimmed = token.trim();
    let digits = trimmed
        .strip_prefix(['+', '-'])
        .unwrap_or(trimmed);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_aliases() {
        assert_eq!(Mode::parse("l").unwrap(), Mode::Log);
        assert_eq!(Mode::parse("log").unwrap(), Mode::Log);
        assert_eq!(Mode::parse("s").unwrap(), Mode::Stat);
        assert_eq!(Mode::parse("stat").unwrap(), Mode::Stat);
        assert_eq!(Mode::parse("v").unwrap(), Mode::Version);
        assert_eq!(Mode::parse("version").unwrap(), Mode::Version);
        assert_eq!(Mode::parse("t").unwrap(), Mode::List);
        assert_eq!(Mode::parse("list").unwrap(), Mode::List);
    }

    #[test]
    fn test_mode_server_selection() {
        assert_eq!(Mode::parse("").unwrap(), Mode::Run(ServerSelection::Auto));
        assert_eq!(Mode::parse("0").unwrap(), Mode::Run(ServerSelection::Auto));
        assert_eq!(
            Mode::parse("12345").unwrap(),
            Mode::Run(ServerSelection::Pinned("12345".to_string()))
        );
        assert_eq!(
            Mode::parse("-7").unwrap(),
            Mode::Run(ServerSelection::Pinned("-7".to_string()))
        );
    }

    #[test]
    fn test_mode_invalid_token() {
        match Mode::parse("abc") {
            Err(SpeedtestError::InvalidServerId(t)) => assert_eq!(t, "abc"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(Mode::parse("12a").is_err());
        assert!(Mode::parse("-").is_err());
        assert!(Mode::parse("logs").is_err());
    }

    #[test]
    fn test_server_id_display() {
        assert_eq!(ServerId::Number(42).to_string(), "42");
        assert_eq!(ServerId::Text("4087".to_string()).to_string(), "4087");
        let parsed: ServerId = serde_json::from_str("\"17\"").unwrap();
        assert_eq!(parsed, ServerId::Text("17".to_string()));
        let parsed: ServerId = serde_json::from_str("17").unwrap();
        assert_eq!(parsed, ServerId::Number(17));
    }
}
