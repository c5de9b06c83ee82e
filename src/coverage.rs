//! A loaded coverage report, optionally paired with the file system holding
//! its sources, and everything derived from it: per-line statuses, file and
//! report aggregates, missed ranges and the annotated source view.

use std::collections::HashMap;
use std::rc::Rc;

use regex::Regex;
use tracing::warn;

use crate::error::{CovdeltaError, Result};
use crate::filesystem::FileSystem;
use crate::memo::Memo;
use crate::model::{CoverageData, FileAggregate, FileCoverage, Line, LineStatus};
use crate::ranges::{rangify_by_status, stringify};
use crate::status::{classify_all, extrapolate};

/// Per-file aggregates plus the report's own root rates, which need not
/// agree with the per-file sums.
#[derive(Debug, Clone)]
pub struct ReportAggregate {
    pub files: Vec<FileAggregate>,
    pub total_statements: u64,
    pub total_hits: u64,
    pub total_misses: u64,
    /// Root `line-rate` attribute.
    pub line_rate: f64,
    /// Root `branch-rate` attribute.
    pub branch_rate: f64,
}

impl ReportAggregate {
    /// Line rate recomputed from the per-file counts.
    #[must_use]
    pub fn computed_line_rate(&self) -> f64 {
        crate::model::line_rate(self.total_statements, self.total_misses)
    }
}

/// One coverage report. Immutable once built; derived values are memoized
/// per instance.
pub struct Cobertura {
    data: CoverageData,
    filesystem: Option<Box<dyn FileSystem>>,
    statuses: Memo<String, Vec<(u32, LineStatus)>>,
    sources: Memo<String, Vec<String>>,
}

impl Cobertura {
    pub fn new(data: CoverageData) -> Self {
        Self {
            data,
            filesystem: None,
            statuses: Memo::new(),
            sources: Memo::new(),
        }
    }

    /// Attach the file system used to read source files.
    pub fn with_filesystem(mut self, filesystem: Box<dyn FileSystem>) -> Self {
        self.filesystem = Some(filesystem);
        self
    }

    /// Drop every file whose name matches `pattern`.
    pub fn with_ignore_regex(mut self, pattern: &Regex) -> Self {
        self.data.files.retain(|f| !pattern.is_match(&f.name));
        self
    }

    /// File names in report order.
    pub fn files(&self) -> Vec<&str> {
        self.data.files.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.data.file(name).is_some()
    }

    pub fn file(&self, name: &str) -> Option<&FileCoverage> {
        self.data.file(name)
    }

    pub fn line_rate(&self) -> f64 {
        self.data.line_rate
    }

    pub fn branch_rate(&self) -> f64 {
        self.data.branch_rate
    }

    /// Classified `(line, status)` pairs for the records of `name`, in line
    /// order. Empty for a file the report does not contain.
    pub fn line_statuses(&self, name: &str) -> Result<Rc<Vec<(u32, LineStatus)>>> {
        self.statuses.get_or_try_insert(&name.to_string(), || match self.file(name) {
            Some(file) => classify_all(&file.lines),
            None => Ok(Vec::new()),
        })
    }

    pub fn aggregate(&self, name: &str) -> Result<FileAggregate> {
        let statuses = self.line_statuses(name)?;
        let total_misses = statuses
            .iter()
            .filter(|(_, s)| *s == LineStatus::Miss)
            .count() as u64;
        let total_statements = statuses.len() as u64;
        Ok(FileAggregate {
            name: name.to_string(),
            total_statements,
            total_hits: total_statements - total_misses,
            total_misses,
        })
    }

    pub fn report_aggregate(&self) -> Result<ReportAggregate> {
        let files = self
            .files()
            .into_iter()
            .map(|name| self.aggregate(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(ReportAggregate {
            total_statements: files.iter().map(|f| f.total_statements).sum(),
            total_hits: files.iter().map(|f| f.total_hits).sum(),
            total_misses: files.iter().map(|f| f.total_misses).sum(),
            files,
            line_rate: self.data.line_rate,
            branch_rate: self.data.branch_rate,
        })
    }

    fn statements_where(
        &self,
        name: &str,
        keep: impl Fn(LineStatus) -> bool,
    ) -> Result<Vec<u32>> {
        Ok(self
            .line_statuses(name)?
            .iter()
            .filter(|(_, s)| keep(*s))
            .map(|(n, _)| *n)
            .collect())
    }

    /// Statement lines that were never executed.
    pub fn missed_statements(&self, name: &str) -> Result<Vec<u32>> {
        self.statements_where(name, |s| s == LineStatus::Miss)
    }

    /// Statement lines that were executed, fully or partially.
    pub fn hit_statements(&self, name: &str) -> Result<Vec<u32>> {
        self.statements_where(name, |s| matches!(s, LineStatus::Hit | LineStatus::Partial))
    }

    /// Statement lines that are missed or only partially covered.
    pub fn uncovered_statements(&self, name: &str) -> Result<Vec<u32>> {
        self.statements_where(name, |s| matches!(s, LineStatus::Miss | LineStatus::Partial))
    }

    /// Extrapolated lines that are missed or partial, for display.
    pub fn missed_lines(&self, name: &str) -> Result<Vec<(u32, LineStatus)>> {
        Ok(extrapolate(&self.line_statuses(name)?)
            .into_iter()
            .filter(|(_, s)| matches!(s, LineStatus::Miss | LineStatus::Partial))
            .collect())
    }

    /// Missed lines of `name` rendered as e.g. `"~4, 5, 9-12"`.
    pub fn missing_ranges(&self, name: &str) -> Result<String> {
        Ok(stringify(&rangify_by_status(&self.missed_lines(name)?)))
    }

    pub fn filesystem(&self) -> Result<&dyn FileSystem> {
        self.filesystem
            .as_deref()
            .ok_or(CovdeltaError::MissingFileSystem)
    }

    /// Whether the source of `name` can be read.
    pub fn has_source(&self, name: &str) -> bool {
        self.filesystem
            .as_deref()
            .is_some_and(|fs| fs.has_file(name))
    }

    /// Source text of `name`, one entry per line.
    pub fn source_lines(&self, name: &str) -> Result<Rc<Vec<String>>> {
        let fs = self.filesystem()?;
        self.sources
            .get_or_try_insert(&name.to_string(), || fs.source_lines(name))
    }

    pub fn file_length(&self, name: &str) -> Result<usize> {
        Ok(self.source_lines(name)?.len())
    }

    /// The source of `name` with each line's status.
    ///
    /// Lines past the last record keep the last known status. A missing
    /// source file yields a single `"<path> not found"` line numbered 0.
    pub fn file_source(&self, name: &str) -> Result<Vec<Line>> {
        let lines = match self.source_lines(name) {
            Ok(lines) => lines,
            Err(CovdeltaError::FileNotFound { path }) => {
                warn!(file = name, %path, "source file not found");
                return Ok(vec![Line {
                    number: 0,
                    source: format!("{path} not found"),
                    status: None,
                }]);
            }
            Err(e) => return Err(e),
        };

        let statuses: HashMap<u32, LineStatus> =
            extrapolate(&self.line_statuses(name)?).into_iter().collect();

        let mut current = None;
        Ok(lines
            .iter()
            .enumerate()
            .map(|(i, source)| {
                let number = i as u32 + 1;
                if let Some(&status) = statuses.get(&number) {
                    current = Some(status);
                }
                Line {
                    number,
                    source: source.clone(),
                    status: current,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::DirectoryFileSystem;
    use crate::model::LineRecord;
    use LineStatus::*;

    fn sample() -> Cobertura {
        let mut data = CoverageData::new();
        data.line_rate = 0.5;
        data.branch_rate = 0.25;
        let mut file = FileCoverage::new("pkg/mod.py".to_string());
        file.lines = vec![
            LineRecord::new(1, 1),
            LineRecord::new(2, 0),
            LineRecord::with_condition(4, 1, "50% (1/2)"),
            LineRecord::new(6, 0),
        ];
        data.files.push(file);
        data.files.push(FileCoverage::new("empty.py".to_string()));
        Cobertura::new(data)
    }

    #[test]
    fn test_aggregate_counts() {
        let cob = sample();
        let agg = cob.aggregate("pkg/mod.py").unwrap();
        assert_eq!(agg.total_statements, 4);
        assert_eq!(agg.total_misses, 2);
        assert_eq!(agg.total_hits, 2);
        assert_eq!(agg.line_rate(), 0.5);

        let empty = cob.aggregate("empty.py").unwrap();
        assert_eq!(empty.total_statements, 0);
        assert_eq!(empty.line_rate(), 1.0);
    }

    #[test]
    fn test_report_aggregate_keeps_root_rates() {
        let cob = sample();
        let agg = cob.report_aggregate().unwrap();
        assert_eq!(agg.total_statements, 4);
        assert_eq!(agg.total_misses, 2);
        assert_eq!(agg.line_rate, 0.5);
        assert_eq!(agg.branch_rate, 0.25);
        assert_eq!(agg.computed_line_rate(), 0.5);
    }

    #[test]
    fn test_statement_sets() {
        let cob = sample();
        assert_eq!(cob.missed_statements("pkg/mod.py").unwrap(), vec![2, 6]);
        assert_eq!(cob.hit_statements("pkg/mod.py").unwrap(), vec![1, 4]);
        assert_eq!(cob.uncovered_statements("pkg/mod.py").unwrap(), vec![2, 4, 6]);
        assert!(cob.missed_statements("unknown.py").unwrap().is_empty());
    }

    #[test]
    fn test_missed_lines_are_extrapolated() {
        let cob = sample();
        assert_eq!(
            cob.missed_lines("pkg/mod.py").unwrap(),
            vec![(2, Miss), (4, Partial), (6, Miss)]
        );
        assert_eq!(cob.missing_ranges("pkg/mod.py").unwrap(), "2, ~4, 6");
    }

    #[test]
    fn test_line_statuses_memoized() {
        let cob = sample();
        let first = cob.line_statuses("pkg/mod.py").unwrap();
        let second = cob.line_statuses("pkg/mod.py").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_ignore_regex() {
        let cob = sample().with_ignore_regex(&Regex::new(r"^pkg/").unwrap());
        assert_eq!(cob.files(), vec!["empty.py"]);
        assert!(!cob.has_file("pkg/mod.py"));
    }

    #[test]
    fn test_file_source_without_filesystem_is_an_error() {
        let cob = sample();
        assert!(matches!(
            cob.file_source("pkg/mod.py"),
            Err(CovdeltaError::MissingFileSystem)
        ));
    }

    #[test]
    fn test_file_source_sticky_status() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
        std::fs::write(
            dir.path().join("pkg/mod.py"),
            "a = 1\nif a:\n\n    b()\n\n    c()\n# end\n",
        )
        .unwrap();

        let cob = sample().with_filesystem(Box::new(DirectoryFileSystem::new(dir.path(), None)));
        let statuses: Vec<_> = cob
            .file_source("pkg/mod.py")
            .unwrap()
            .into_iter()
            .map(|l| (l.number, l.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                (1, Some(Hit)),
                (2, Some(Miss)),
                (3, Some(Unknown)),
                (4, Some(Partial)),
                (5, Some(Unknown)),
                (6, Some(Miss)),
                (7, Some(Miss)),
            ]
        );
        assert_eq!(cob.file_length("pkg/mod.py").unwrap(), 7);
    }

    #[test]
    fn test_file_source_not_found_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let cob = sample().with_filesystem(Box::new(DirectoryFileSystem::new(dir.path(), None)));
        let lines = cob.file_source("pkg/mod.py").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].number, 0);
        assert!(lines[0].source.ends_with("pkg/mod.py not found"));
        assert_eq!(lines[0].status, None);
        assert!(!cob.has_source("pkg/mod.py"));
    }
}
