use crate::error::{Result, SpeedtestError};
use chrono::{DateTime, Local, Timelike, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Round to two decimals, the precision of every reported figure.
/// Exact halves go to the even neighbour: 0.125 -> 0.12, 0.375 -> 0.38.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Drop the last `n` characters of `s`; `None` when `s` is shorter than that.
pub fn drop_last_chars(s: &str, n: usize) -> Option<&str> {
    if n == 0 {
        return Some(s);
    }
    s.char_indices().rev().nth(n - 1).map(|(idx, _)| &s[..idx])
}

/// Convert stored epoch seconds (with fraction) to local time, microsecond precision.
pub fn epoch_to_local(epoch: f64) -> Result<DateTime<Local>> {
    if !epoch.is_finite() {
        return Err(SpeedtestError::Timestamp(epoch.to_string()));
    }
    let micros = (epoch * 1_000_000.0).round() as i64;
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .map(|dt| dt.with_timezone(&Local))
        .ok_or_else(|| SpeedtestError::Timestamp(epoch.to_string()))
}

/// Parse the canonical "...Z" timestamp into epoch seconds.
pub fn iso_to_epoch(iso: &str) -> Result<f64> {
    let dt = DateTime::parse_from_rfc3339(iso)
        .map_err(|e| SpeedtestError::Timestamp(format!("{}: {}", iso, e)))?;
    Ok(dt.timestamp_micros() as f64 / 1_000_000.0)
}

/// `2021-05-01T12:00:00`, microseconds appended only when present.
pub fn display_iso(dt: &DateTime<Local>) -> String {
    format_with_separator(dt, 'T')
}

/// `2021-05-01 12:00:00`, microseconds appended only when present.
pub fn display_plain(dt: &DateTime<Local>) -> String {
    format_with_separator(dt, ' ')
}

fn format_with_separator(dt: &DateTime<Local>, sep: char) -> String {
    let base = format!(
        "{}{}{}",
        dt.format("%Y-%m-%d"),
        sep,
        dt.format("%H:%M:%S")
    );
    let micros = dt.nanosecond() / 1_000;
    if micros == 0 {
        base
    } else {
        format!("{}.{:06}", base, micros)
    }
}

/// Float rendering used for log columns on display: `50.0`, `12.34`.
pub fn format_float(value: f64) -> String {
    format!("{:?}", value)
}

/// Spinner on stderr while the external binary runs.
/// indicatif hides it when stderr is not a terminal.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
