pub mod legacy;
pub mod ookla;

use crate::traits::DialectAdapter;

/// Vendor marker printed by the full-featured binary in its version string.
pub const VENDOR_MARKER: &str = "Ookla";

pub const VERSION_FLAG: &str = "--version";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Vendor binary with native JSON output
    Full,
    /// speedtest-cli style binary
    Legacy,
}

impl Dialect {
    /// Decide the dialect from `--version` output.
    /// The marker only counts past the first character.
    pub fn detect(version_output: &str) -> Self {
        match version_output.find(VENDOR_MARKER) {
            Some(idx) if idx > 0 => Dialect::Full,
            _ => Dialect::Legacy,
        }
    }

    pub fn adapter(self) -> Box<dyn DialectAdapter> {
        match self {
            Dialect::Full => Box::new(ookla::OoklaAdapter::new()),
            Dialect::Legacy => Box::new(legacy::LegacyAdapter::new()),
        }
    }
}

pub fn version_args() -> Vec<String> {
    vec![VERSION_FLAG.to_string()]
}
