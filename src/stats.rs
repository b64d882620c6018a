use crate::error::Result;
use crate::types::{LogRow, Period, Stats, Summary};
use crate::utils::{display_iso, display_plain, epoch_to_local, format_float, round2};
use chrono::{DateTime, Local};

/// One history entry: the nine log columns with a readable timestamp.
pub type HistoryEntry = [String; 9];

impl LogRow {
    fn to_history_entry(&self) -> Result<HistoryEntry> {
        Ok([
            display_iso(&epoch_to_local(self.timestamp)?),
            self.client_ip.clone(),
            self.server_id.clone(),
            self.server_name.clone(),
            self.country.clone(),
            format_float(self.download),
            format_float(self.upload),
            format_float(self.latency),
            self.link.clone(),
        ])
    }
}

/// Newest first, at most `limit` entries.
/// Entries sort descending as whole string tuples, so equal timestamps
/// are ordered by the following columns.
pub fn history(rows: &[LogRow], limit: usize) -> Result<Vec<HistoryEntry>> {
    let mut entries = rows
        .iter()
        .map(LogRow::to_history_entry)
        .collect::<Result<Vec<_>>>()?;
    entries.sort_by(|a, b| b.cmp(a));
    entries.truncate(limit);
    Ok(entries)
}

/// Aggregate statistics over the whole log.
/// An empty log is reported as one zero-valued sample taken at `now`,
/// with `samples` still 0.
pub fn summarize(rows: &[LogRow], now: DateTime<Local>) -> Result<Stats> {
    let mut times = Vec::with_capacity(rows.len());
    for row in rows {
        times.push(epoch_to_local(row.timestamp)?);
    }
    let mut latency: Vec<f64> = rows.iter().map(|r| r.latency).collect();
    let mut download: Vec<f64> = rows.iter().map(|r| r.download).collect();
    let mut upload: Vec<f64> = rows.iter().map(|r| r.upload).collect();

    if rows.is_empty() {
        times.push(now);
        latency.push(0.0);
        download.push(0.0);
        upload.push(0.0);
    }

    let oldest = times.iter().min().copied().unwrap_or(now);
    let youngest = times.iter().max().copied().unwrap_or(now);

    Ok(Stats {
        samples: rows.len(),
        period: Period {
            oldest: display_plain(&oldest),
            youngest: display_plain(&youngest),
        },
        latency: summary(&latency),
        download: summary(&download),
        upload: summary(&upload),
    })
}

/// `values` is never empty here.
fn summary(values: &[f64]) -> Summary {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    Summary {
        avg: round2(avg),
        min: round2(min),
        max: round2(max),
    }
}
