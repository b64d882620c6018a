use crate::dialects::Dialect;
use crate::error::Result;
use crate::types::{ResultRecord, ServerListEntry, VersionInfo};
use async_trait::async_trait;

/// CommandRunner: invokes the external speed test binary.
#[async_trait]
pub trait CommandRunner: Sync + Send {
    /// Run the binary with `args` and return stdout followed by stderr.
    ///
    /// Errors:
    /// - `Io` if the binary cannot be found or started
    /// - `NonZeroExit` if it ran but failed
    async fn run(&self, args: &[String]) -> Result<String>;
}

/// DialectAdapter: everything that differs between the two binary variants
pub trait DialectAdapter: Sync + Send {
    fn dialect(&self) -> Dialect;

    /// Version mode payload built from the `--version` output
    fn version_info(&self, output: &str) -> VersionInfo;

    /// Flags that make the binary print its server list
    fn list_args(&self) -> Vec<String>;

    fn parse_server_list(&self, output: &str) -> Result<Vec<ServerListEntry>>;

    /// Flags for a test run; `server` pins a server id when present
    fn run_args(&self, server: Option<&str>) -> Vec<String>;

    /// Map the raw run output to the canonical record
    fn normalize(&self, output: &str) -> Result<ResultRecord>;
}
