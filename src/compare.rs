//! Comparing two coverage reports of the same project.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, info};

use crate::coverage::Cobertura;
use crate::diff::{hunkify, invert, reconcile_lines, LineNumberMap};
use crate::error::Result;
use crate::model::{line_rate, ChangeReason, DiffLine, LineStatus};
use crate::status::extrapolate;

/// Per-file change between the two reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FileDelta {
    /// Only in the newer report. Counts are the newer report's absolute
    /// values.
    Added(FileChange),
    /// Only in the older report.
    Removed { total_statements: u64 },
    /// In both reports; counts are new minus old.
    Changed(FileChange),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileChange {
    pub total_statements: i64,
    pub total_misses: i64,
    pub total_hits: i64,
    pub line_rate: f64,
    /// Uncovered statement lines of the new version that were not uncovered
    /// before (new line numbers).
    pub missed_added: Vec<u32>,
    /// Uncovered statement lines of the old version that are now covered
    /// (old line numbers).
    pub missed_removed: Vec<u32>,
}

impl FileDelta {
    /// Statement delta, with a removed file counting as the negative of its
    /// old size.
    pub fn statements(&self) -> i64 {
        match self {
            FileDelta::Added(c) | FileDelta::Changed(c) => c.total_statements,
            FileDelta::Removed { total_statements } => -(*total_statements as i64),
        }
    }

    pub fn change(&self) -> Option<&FileChange> {
        match self {
            FileDelta::Added(c) | FileDelta::Changed(c) => Some(c),
            FileDelta::Removed { .. } => None,
        }
    }

    /// Uncovered lines introduced by the newer report.
    pub fn missed_added(&self) -> &[u32] {
        self.change()
            .map(|c| c.missed_added.as_slice())
            .unwrap_or_default()
    }

    pub fn missed_removed(&self) -> &[u32] {
        self.change()
            .map(|c| c.missed_removed.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDiff {
    pub name: String,
    #[serde(flatten)]
    pub delta: FileDelta,
}

/// Verdict of a comparison, mapped onto process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffOutcome {
    /// No new uncovered lines; the overall line rate did not go up.
    AllChangesCovered,
    /// No new uncovered lines and the overall line rate went up.
    Improved,
    /// Some file gained uncovered lines.
    NotAllChangesCovered,
}

impl DiffOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            DiffOutcome::AllChangesCovered | DiffOutcome::Improved => 0,
            DiffOutcome::NotAllChangesCovered => 3,
        }
    }
}

/// Two reports, older first.
pub struct CoberturaDiff {
    cobertura1: Cobertura,
    cobertura2: Cobertura,
}

impl CoberturaDiff {
    pub fn new(cobertura1: Cobertura, cobertura2: Cobertura) -> Self {
        Self {
            cobertura1,
            cobertura2,
        }
    }

    pub fn new_report(&self) -> &Cobertura {
        &self.cobertura2
    }

    /// Sorted union of the file names of both reports.
    pub fn files(&self) -> Vec<String> {
        self.cobertura1
            .files()
            .into_iter()
            .chain(self.cobertura2.files())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Root line-rate of the newer report minus that of the older one.
    pub fn line_rate_delta(&self) -> f64 {
        self.cobertura2.line_rate() - self.cobertura1.line_rate()
    }

    pub fn branch_rate_delta(&self) -> f64 {
        self.cobertura2.branch_rate() - self.cobertura1.branch_rate()
    }

    pub fn has_better_coverage(&self) -> bool {
        self.line_rate_delta() > 0.0
    }

    /// `None` when neither report contains `name`.
    pub fn file_delta(&self, name: &str) -> Result<Option<FileDelta>> {
        let in_old = self.cobertura1.has_file(name);
        let in_new = self.cobertura2.has_file(name);

        let delta = match (in_old, in_new) {
            (false, false) => None,
            (true, false) => Some(FileDelta::Removed {
                total_statements: self.cobertura1.aggregate(name)?.total_statements,
            }),
            (false, true) => {
                let agg = self.cobertura2.aggregate(name)?;
                Some(FileDelta::Added(FileChange {
                    total_statements: agg.total_statements as i64,
                    total_misses: agg.total_misses as i64,
                    total_hits: agg.total_hits as i64,
                    line_rate: agg.line_rate(),
                    missed_added: self.cobertura2.uncovered_statements(name)?,
                    missed_removed: Vec::new(),
                }))
            }
            (true, true) => {
                let old = self.cobertura1.aggregate(name)?;
                let new = self.cobertura2.aggregate(name)?;
                let (missed_added, missed_removed) = self.diff_missed_lines(name)?;
                Some(FileDelta::Changed(FileChange {
                    total_statements: new.total_statements as i64 - old.total_statements as i64,
                    total_misses: new.total_misses as i64 - old.total_misses as i64,
                    total_hits: new.total_hits as i64 - old.total_hits as i64,
                    line_rate: new.line_rate() - old.line_rate(),
                    missed_added,
                    missed_removed,
                }))
            }
        };
        Ok(delta)
    }

    pub fn file_deltas(&self) -> Result<Vec<FileDiff>> {
        let mut out = Vec::new();
        for name in self.files() {
            if let Some(delta) = self.file_delta(&name)? {
                out.push(FileDiff { name, delta });
            }
        }
        Ok(out)
    }

    /// Uncovered statement lines `(added, removed)` between the two versions
    /// of `name`. Added lines are new line numbers, removed ones old.
    ///
    /// With both sources readable, old misses are carried to their new line
    /// numbers first; an old miss on a line that no longer exists is neither
    /// added nor removed. Without sources, raw line numbers are compared.
    pub fn diff_missed_lines(&self, name: &str) -> Result<(Vec<u32>, Vec<u32>)> {
        let old = self.cobertura1.uncovered_statements(name)?;
        let new: BTreeSet<u32> = self.cobertura2.uncovered_statements(name)?.into_iter().collect();

        let Some(old_to_new) = self.line_map(name)? else {
            let old: BTreeSet<u32> = old.into_iter().collect();
            return Ok((
                new.difference(&old).copied().collect(),
                old.difference(&new).copied().collect(),
            ));
        };

        let carried: BTreeSet<u32> = old
            .iter()
            .filter_map(|n| old_to_new.get(n).copied())
            .collect();
        let added = new.difference(&carried).copied().collect();
        let removed = old
            .into_iter()
            .filter(|n| old_to_new.get(n).is_some_and(|m| !new.contains(m)))
            .collect();
        Ok((added, removed))
    }

    /// Old -> new line numbers of `name`, when both versions can be read.
    fn line_map(&self, name: &str) -> Result<Option<LineNumberMap>> {
        if !(self.cobertura1.has_source(name) && self.cobertura2.has_source(name)) {
            return Ok(None);
        }
        let lines1 = self.cobertura1.source_lines(name)?;
        let lines2 = self.cobertura2.source_lines(name)?;
        Ok(Some(reconcile_lines(lines1.as_slice(), lines2.as_slice())))
    }

    pub fn total_statements_delta(&self) -> Result<i64> {
        let old = self.cobertura1.report_aggregate()?;
        let new = self.cobertura2.report_aggregate()?;
        Ok(new.total_statements as i64 - old.total_statements as i64)
    }

    pub fn total_misses_delta(&self) -> Result<i64> {
        let old = self.cobertura1.report_aggregate()?;
        let new = self.cobertura2.report_aggregate()?;
        Ok(new.total_misses as i64 - old.total_misses as i64)
    }

    pub fn total_hits_delta(&self) -> Result<i64> {
        let old = self.cobertura1.report_aggregate()?;
        let new = self.cobertura2.report_aggregate()?;
        Ok(new.total_hits as i64 - old.total_hits as i64)
    }

    /// Line rate recomputed from the summed counts of the newer report
    /// minus that of the older one.
    pub fn computed_line_rate_delta(&self) -> Result<f64> {
        let old = self.cobertura1.report_aggregate()?;
        let new = self.cobertura2.report_aggregate()?;
        Ok(line_rate(new.total_statements, new.total_misses)
            - line_rate(old.total_statements, old.total_misses))
    }

    /// True when no file gained an uncovered statement line.
    pub fn has_all_changes_covered(&self) -> Result<bool> {
        for name in self.files() {
            if let Some(delta) = self.file_delta(&name)? {
                if !delta.missed_added().is_empty() {
                    debug!(file = %name, lines = ?delta.missed_added(), "new uncovered lines");
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    pub fn outcome(&self) -> Result<DiffOutcome> {
        let outcome = if !self.has_all_changes_covered()? {
            DiffOutcome::NotAllChangesCovered
        } else if self.has_better_coverage() {
            DiffOutcome::Improved
        } else {
            DiffOutcome::AllChangesCovered
        };
        info!(?outcome, line_rate_delta = self.line_rate_delta(), "compared reports");
        Ok(outcome)
    }

    /// The newer source of `name`, each line marked with what changed.
    ///
    /// Lines with no counterpart in the older source are `LineEdit` and carry
    /// their current coverage. Matched lines are `CovUp`/`CovDown` when they
    /// flipped between hit and missed, and unmarked otherwise.
    pub fn file_source(&self, name: &str) -> Result<Vec<DiffLine>> {
        let lines2 = self.cobertura2.source_lines(name)?;
        let fs1 = self.cobertura1.filesystem()?;
        let lines1 = if self.cobertura1.has_file(name) && fs1.has_file(name) {
            self.cobertura1.source_lines(name)?.to_vec()
        } else {
            Vec::new()
        };

        let statuses1: HashMap<u32, LineStatus> =
            extrapolate(&self.cobertura1.line_statuses(name)?).into_iter().collect();
        let statuses2: HashMap<u32, LineStatus> =
            extrapolate(&self.cobertura2.line_statuses(name)?).into_iter().collect();

        let new_to_old = invert(&reconcile_lines(lines1.as_slice(), lines2.as_slice()));

        Ok(lines2
            .iter()
            .enumerate()
            .map(|(i, source)| {
                let number = i as u32 + 1;
                let new_status = statuses2.get(&number).copied();
                let (status, reason) = match new_to_old.get(&number) {
                    None => (
                        new_status.and_then(|s| s.as_covered()),
                        Some(ChangeReason::LineEdit),
                    ),
                    Some(old_number) => {
                        let old_status = statuses1.get(old_number).copied();
                        match (old_status, new_status) {
                            (
                                Some(LineStatus::Miss | LineStatus::Partial),
                                Some(LineStatus::Hit),
                            ) => (Some(true), Some(ChangeReason::CovUp)),
                            (
                                Some(LineStatus::Hit),
                                Some(LineStatus::Miss | LineStatus::Partial),
                            ) => (Some(false), Some(ChangeReason::CovDown)),
                            _ => (None, None),
                        }
                    }
                };
                DiffLine {
                    number,
                    source: source.clone(),
                    status,
                    reason,
                }
            })
            .collect())
    }

    /// [`Self::file_source`] cut into hunks of changed lines with `context`
    /// lines around them.
    pub fn file_source_hunks(&self, name: &str, context: usize) -> Result<Vec<Vec<DiffLine>>> {
        let lines = self.file_source(name)?;
        Ok(hunkify(&lines, context)
            .into_iter()
            .map(<[DiffLine]>::to_vec)
            .collect())
    }
}
