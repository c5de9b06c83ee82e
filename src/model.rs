//! In-memory representation of a Cobertura report and of the line views
//! derived from it. Parsers produce a `CoverageData`; everything else is
//! computed from it on demand.

use serde::Serialize;

/// Fraction of statements hit, defined as 1.0 for a file with no statements.
#[must_use]
pub fn line_rate(total_statements: u64, total_misses: u64) -> f64 {
    if total_statements == 0 {
        1.0
    } else {
        (total_statements - total_misses) as f64 / total_statements as f64
    }
}

/// One instrumented statement line, as read from the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    pub number: u32,
    pub hits: u64,
    /// Raw `condition-coverage` attribute, e.g. `"50% (1/2)"`.
    pub condition_coverage: Option<String>,
}

impl LineRecord {
    pub fn new(number: u32, hits: u64) -> Self {
        Self {
            number,
            hits,
            condition_coverage: None,
        }
    }

    pub fn with_condition(number: u32, hits: u64, condition: &str) -> Self {
        Self {
            number,
            hits,
            condition_coverage: Some(condition.to_string()),
        }
    }
}

/// Coverage status of a single source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStatus {
    Hit,
    Miss,
    Partial,
    /// Only produced for lines without a record, by extrapolation.
    Unknown,
}

impl LineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Hit => "hit",
            LineStatus::Miss => "miss",
            LineStatus::Partial => "partial",
            LineStatus::Unknown => "unknown",
        }
    }

    /// `Some(true)` for hit, `Some(false)` for miss or partial, `None` when
    /// nothing is known about the line.
    pub fn as_covered(&self) -> Option<bool> {
        match self {
            LineStatus::Hit => Some(true),
            LineStatus::Miss | LineStatus::Partial => Some(false),
            LineStatus::Unknown => None,
        }
    }
}

impl std::fmt::Display for LineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a line is highlighted in a two-report source view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeReason {
    #[serde(rename = "line-edit")]
    LineEdit,
    #[serde(rename = "cov-up")]
    CovUp,
    #[serde(rename = "cov-down")]
    CovDown,
}

impl ChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeReason::LineEdit => "line-edit",
            ChangeReason::CovUp => "cov-up",
            ChangeReason::CovDown => "cov-down",
        }
    }
}

/// A source line annotated with its coverage status (single report).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub number: u32,
    pub source: String,
    pub status: Option<LineStatus>,
}

/// A source line of the newer file in a two-report view.
///
/// `status` is `Some(true)` when the line is (now) covered, `Some(false)`
/// when it is (now) missed and `None` when it is unaffected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffLine {
    pub number: u32,
    pub source: String,
    pub status: Option<bool>,
    pub reason: Option<ChangeReason>,
}

/// Coverage records for a single source file.
#[derive(Debug, Clone, Default)]
pub struct FileCoverage {
    /// File name as written in the report's `filename` attribute.
    pub name: String,
    /// Records sorted by line number, at most one per line.
    pub lines: Vec<LineRecord>,
}

impl FileCoverage {
    pub fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }
}

/// The complete result of parsing a single coverage report.
#[derive(Debug, Clone, Default)]
pub struct CoverageData {
    /// Root-level `line-rate`, as reported (not recomputed).
    pub line_rate: f64,
    /// Root-level `branch-rate`, as reported.
    pub branch_rate: f64,
    /// `<source>` entries in document order.
    pub sources: Vec<String>,
    pub files: Vec<FileCoverage>,
}

impl CoverageData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self, name: &str) -> Option<&FileCoverage> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Statement counts for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAggregate {
    pub name: String,
    pub total_statements: u64,
    pub total_hits: u64,
    pub total_misses: u64,
}

impl FileAggregate {
    #[must_use]
    pub fn line_rate(&self) -> f64 {
        line_rate(self.total_statements, self.total_misses)
    }
}

/// A single range annotation in GitHub workflow-command form.
#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    /// Source file path as named in the report.
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub title: String,
    pub message: String,
}
