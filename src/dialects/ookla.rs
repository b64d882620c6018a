use crate::dialects::Dialect;
use crate::error::{Result, SpeedtestError};
use crate::traits::DialectAdapter;
use crate::types::{ResultRecord, ServerId, ServerListEntry, VersionInfo};
use crate::utils::round2;
use serde::Deserialize;

/// Bytes per second in one megabit per second
const BYTES_PER_MBIT: f64 = 125_000.0;

const CONSENT_FLAGS: [&str; 2] = ["--accept-license", "--accept-gdpr"];

/// Run output of the vendor binary (`-fjson`)
#[derive(Debug, Deserialize)]
pub struct OoklaResult {
    pub timestamp: String,
    pub interface: Interface,
    pub server: Server,
    pub ping: Ping,
    pub download: Bandwidth,
    pub upload: Bandwidth,
    pub result: ResultLink,
}

#[derive(Debug, Deserialize)]
pub struct Interface {
    #[serde(rename = "externalIp")]
    pub external_ip: String,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub id: ServerId,
    pub name: String,
    pub location: String,
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct Ping {
    pub latency: f64,
}

#[derive(Debug, Deserialize)]
pub struct Bandwidth {
    /// bytes per second
    pub bandwidth: f64,
}

#[derive(Debug, Deserialize)]
pub struct ResultLink {
    pub url: String,
}

impl OoklaResult {
    pub fn into_record(self) -> ResultRecord {
        ResultRecord {
            timestamp: self.timestamp,
            client_ip: self.interface.external_ip,
            server_id: self.server.id,
            server_name: format!("{}, {}", self.server.name, self.server.location),
            country: self.server.country,
            latency: round2(self.ping.latency),
            download: round2(self.download.bandwidth / BYTES_PER_MBIT),
            upload: round2(self.upload.bandwidth / BYTES_PER_MBIT),
            link: self.result.url,
        }
    }
}

/// One line of `--servers -fjsonl`
#[derive(Debug, Deserialize)]
struct ServerLine {
    id: ServerId,
    name: String,
    location: String,
    country: String,
}

pub struct OoklaAdapter;

impl OoklaAdapter {
    pub fn new() -> Self {
        Self
    }

    fn base_args() -> Vec<String> {
        CONSENT_FLAGS.iter().map(|s| s.to_string()).collect()
    }
}

impl DialectAdapter for OoklaAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Full
    }

    fn version_info(&self, output: &str) -> VersionInfo {
        VersionInfo {
            version: "binary",
            message: output.lines().next().unwrap_or_default().to_string(),
        }
    }

    fn list_args(&self) -> Vec<String> {
        let mut args = Self::base_args();
        args.extend(["--servers".to_string(), "-fjsonl".to_string()]);
        args
    }

    fn parse_server_list(&self, output: &str) -> Result<Vec<ServerListEntry>> {
        output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let server: ServerLine = serde_json::from_str(line)?;
                Ok(ServerListEntry {
                    id: server.id.to_string(),
                    name: server.name,
                    location: server.location,
                    country: server.country,
                })
            })
            .collect()
    }

    fn run_args(&self, server: Option<&str>) -> Vec<String> {
        let mut args = Self::base_args();
        args.push("-fjson".to_string());
        if let Some(id) = server {
            args.push(format!("-s{}", id));
        }
        args
    }

    fn normalize(&self, output: &str) -> Result<ResultRecord> {
        let parsed = serde_json::Deserializer::from_str(output)
            .into_iter::<OoklaResult>()
            .next()
            .ok_or_else(|| SpeedtestError::Malformed("empty run output".to_string()))??;
        Ok(parsed.into_record())
    }
}
