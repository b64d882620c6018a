use crate::dialects::Dialect;
use crate::error::{Result, SpeedtestError};
use crate::traits::DialectAdapter;
use crate::types::{ResultRecord, ServerId, ServerListEntry, VersionInfo};
use crate::utils::{drop_last_chars, round2};
use regex::Regex;
use serde::Deserialize;

/// Bits per second in one megabit per second
const BITS_PER_MBIT: f64 = 1_000_000.0;

/// Length of the fractional-seconds suffix on legacy timestamps (".ffffffZ")
const TIMESTAMP_SUFFIX_LEN: usize = 8;

/// Length of the image extension on share links (".png")
const SHARE_SUFFIX_LEN: usize = 4;

/// Only this many servers are read from `--list`
const LIST_LIMIT: usize = 10;

/// Run output of speedtest-cli (`--json --share`)
#[derive(Debug, Deserialize)]
pub struct LegacyResult {
    pub timestamp: String,
    pub client: Client,
    pub server: Server,
    /// ms
    pub ping: f64,
    /// bits per second
    pub download: f64,
    /// bits per second
    pub upload: f64,
    pub share: String,
}

#[derive(Debug, Deserialize)]
pub struct Client {
    pub ip: String,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub id: ServerId,
    pub sponsor: String,
    pub name: String,
    pub country: String,
}

impl LegacyResult {
    pub fn into_record(self) -> Result<ResultRecord> {
        let stem = drop_last_chars(&self.timestamp, TIMESTAMP_SUFFIX_LEN)
            .ok_or_else(|| SpeedtestError::Timestamp(self.timestamp.clone()))?;

        Ok(ResultRecord {
            timestamp: format!("{}Z", stem),
            client_ip: self.client.ip,
            server_id: self.server.id,
            server_name: format!("{}, {}", self.server.sponsor, self.server.name),
            country: self.server.country,
            latency: round2(self.ping),
            download: round2(self.download / BITS_PER_MBIT),
            upload: round2(self.upload / BITS_PER_MBIT),
            link: drop_last_chars(&self.share, SHARE_SUFFIX_LEN)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

pub struct LegacyAdapter;

impl LegacyAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl DialectAdapter for LegacyAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Legacy
    }

    fn version_info(&self, output: &str) -> VersionInfo {
        let message = output.lines().take(2).collect::<Vec<_>>().join(" ");
        VersionInfo {
            version: "cli",
            message,
        }
    }

    fn list_args(&self) -> Vec<String> {
        vec!["--list".to_string()]
    }

    /// Lines look like `1234) Sponsor (City, Region, Country) [5.10 km]`.
    /// Splitting is positional; names containing a separator shift the fields.
    fn parse_server_list(&self, output: &str) -> Result<Vec<ServerListEntry>> {
        let re = Regex::new(r"\) | \(|, ").map_err(|e| SpeedtestError::Malformed(e.to_string()))?;

        output
            .lines()
            .skip(1) // "Retrieving speedtest.net configuration..."
            .take(LIST_LIMIT)
            .map(|line| {
                let rec: Vec<&str> = re.split(line).collect();
                if rec.len() < 5 {
                    return Err(SpeedtestError::Malformed(format!("server list line: {}", line)));
                }
                Ok(ServerListEntry {
                    id: rec[0].trim().to_string(),
                    name: rec[1].trim().to_string(),
                    location: format!("{}, {}", rec[2].trim(), rec[3]),
                    country: rec[4].trim().to_string(),
                })
            })
            .collect()
    }

    fn run_args(&self, server: Option<&str>) -> Vec<String> {
        let mut args = vec!["--json".to_string(), "--share".to_string()];
        if let Some(id) = server {
            args.extend(["--server".to_string(), id.to_string()]);
        }
        args
    }

    fn normalize(&self, output: &str) -> Result<ResultRecord> {
        let parsed = serde_json::Deserializer::from_str(output)
            .into_iter::<LegacyResult>()
            .next()
            .ok_or_else(|| SpeedtestError::Malformed("empty run output".to_string()))??;
        parsed.into_record()
    }
}
