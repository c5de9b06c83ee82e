//! Line-level reconciliation of two versions of a source file, and grouping
//! of annotated lines into display hunks.

use std::collections::BTreeMap;

use similar::{Algorithm, ChangeTag, TextDiff};

use crate::model::DiffLine;

/// Lines of context kept around each change when building hunks.
pub const DEFAULT_CONTEXT: usize = 3;

/// Old (1-based) line number -> new line number, for unchanged lines only.
pub type LineNumberMap = BTreeMap<u32, u32>;

/// Map line numbers of `lines1` onto `lines2` using an LCS line diff.
///
/// Only lines the diff reports as equal get an entry; inserted, deleted and
/// edited lines are absent and callers must not guess a number for them.
/// The map is increasing in both keys and values.
///
/// The LCS diff is quadratic in the worst case. That is fine for source
/// files but very large generated files will be slow.
pub fn reconcile_lines<S: AsRef<str>>(lines1: &[S], lines2: &[S]) -> LineNumberMap {
    let old: Vec<&str> = lines1.iter().map(AsRef::as_ref).collect();
    let new: Vec<&str> = lines2.iter().map(AsRef::as_ref).collect();

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Lcs)
        .diff_slices(&old, &new);

    let mut mapping = LineNumberMap::new();
    let mut old_pos: u32 = 0;
    let mut new_pos: u32 = 0;

    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => {
                old_pos += 1;
                new_pos += 1;
                mapping.insert(old_pos, new_pos);
            }
            ChangeTag::Delete => old_pos += 1,
            ChangeTag::Insert => new_pos += 1,
        }
    }

    mapping
}

/// Reverse a map so it can be looked up by new line number.
pub fn invert(map: &LineNumberMap) -> LineNumberMap {
    map.iter().map(|(&old, &new)| (new, old)).collect()
}

/// Split annotated lines into hunks: runs of changed lines (non-`None`
/// status) padded with `context` lines on each side, overlapping or touching
/// windows merged. Returns slices of `lines`.
pub fn hunkify(lines: &[DiffLine], context: usize) -> Vec<&[DiffLine]> {
    // Changed runs as half-open index ranges.
    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, line) in lines.iter().enumerate() {
        match (line.status.is_some(), run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                runs.push((start, i));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        runs.push((start, lines.len()));
    }

    let mut windows: Vec<(usize, usize)> = Vec::with_capacity(runs.len());
    for (start, stop) in runs {
        let start = start.saturating_sub(context);
        let stop = stop.saturating_add(context).min(lines.len());
        match windows.last_mut() {
            Some(prev) if start <= prev.1 => prev.1 = prev.1.max(stop),
            _ => windows.push((start, stop)),
        }
    }

    windows
        .into_iter()
        .map(|(start, stop)| &lines[start..stop])
        .collect()
}
