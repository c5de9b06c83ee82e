//! Per-line status derivation: classifying raw records and extrapolating
//! statuses onto the lines between them.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CovdeltaError, Result};
use crate::model::{LineRecord, LineStatus};

/// Leading percentage of a `condition-coverage` attribute like "75% (3/4)".
static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)%").unwrap());

/// Classify one record as hit, miss or partial.
///
/// Condition coverage wins when present; otherwise the hit count decides.
pub fn classify(record: &LineRecord) -> Result<LineStatus> {
    let Some(cond) = record.condition_coverage.as_deref() else {
        return Ok(if record.hits == 0 {
            LineStatus::Miss
        } else {
            LineStatus::Hit
        });
    };

    let pct: f64 = PERCENT_RE
        .captures(cond)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| {
            CovdeltaError::MalformedReport(format!(
                "line {}: unparseable condition-coverage '{}'",
                record.number, cond
            ))
        })?;

    Ok(if pct >= 100.0 {
        LineStatus::Hit
    } else if pct == 0.0 {
        LineStatus::Miss
    } else {
        LineStatus::Partial
    })
}

/// Classify every record, keeping their order.
pub fn classify_all(records: &[LineRecord]) -> Result<Vec<(u32, LineStatus)>> {
    records
        .iter()
        .map(|r| classify(r).map(|status| (r.number, status)))
        .collect()
}

/// Fill the gaps of an ascending `(line, status)` sequence.
///
/// The output has one entry per line from 1 through the last input line.
/// A gap line takes the status shared by both sides of the gap, or
/// `Unknown` when they differ. Lines before the first record are treated as
/// following a hit. Dense input is returned unchanged.
#[must_use]
pub fn extrapolate(statuses: &[(u32, LineStatus)]) -> Vec<(u32, LineStatus)> {
    let mut out = Vec::with_capacity(statuses.last().map_or(0, |&(n, _)| n as usize));
    let mut prev_number = 0u32;
    let mut prev_status = LineStatus::Hit;

    for &(number, status) in statuses {
        debug_assert!(number > prev_number, "extrapolate requires ascending input");
        let fill = if prev_status == status {
            status
        } else {
            LineStatus::Unknown
        };
        out.extend((prev_number + 1..number).map(|n| (n, fill)));
        out.push((number, status));
        prev_number = number;
        prev_status = status;
    }

    out
}
