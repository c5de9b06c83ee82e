//! Output formatting for single-report summaries and two-report deltas.

use std::fmt::Write;

use serde::Serialize;

use crate::compare::{CoberturaDiff, DiffOutcome, FileDelta, FileDiff};
use crate::coverage::Cobertura;
use crate::error::Result;
use crate::model::{Annotation, ChangeReason, DiffLine, Line, LineStatus};
use crate::ranges::rangify;

pub const DEFAULT_ANNOTATION_TITLE: &str = "Missing coverage";
pub const DEFAULT_ANNOTATION_MESSAGE: &str = "Line missing coverage";

/// One file of a single-report summary.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub filename: String,
    pub total_statements: u64,
    pub total_misses: u64,
    pub line_rate: f64,
    /// Missed ranges, e.g. `"~4, 5"`.
    pub missing: String,
    /// Missed and partial lines, used for annotations.
    #[serde(skip)]
    pub missed_lines: Vec<u32>,
}

/// Summary of one report, ready to be formatted.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub files: Vec<SummaryRow>,
    /// Totals; `line_rate` is the report's own root rate.
    pub total: SummaryRow,
}

impl SummaryReport {
    pub fn build(cobertura: &Cobertura) -> Result<Self> {
        let mut files = Vec::new();
        for name in cobertura.files() {
            let agg = cobertura.aggregate(name)?;
            files.push(SummaryRow {
                filename: name.to_string(),
                total_statements: agg.total_statements,
                total_misses: agg.total_misses,
                line_rate: agg.line_rate(),
                missing: cobertura.missing_ranges(name)?,
                missed_lines: cobertura
                    .missed_lines(name)?
                    .into_iter()
                    .map(|(n, _)| n)
                    .collect(),
            });
        }

        let totals = cobertura.report_aggregate()?;
        Ok(Self {
            files,
            total: SummaryRow {
                filename: "TOTAL".to_string(),
                total_statements: totals.total_statements,
                total_misses: totals.total_misses,
                line_rate: totals.line_rate,
                missing: String::new(),
                missed_lines: Vec::new(),
            },
        })
    }

    #[must_use]
    pub fn format(&self, formatter: &dyn ReportFormatter) -> String {
        formatter.format_summary(self)
    }

    pub fn annotations(&self, title: &str, message: &str) -> Vec<Annotation> {
        self.files
            .iter()
            .flat_map(|row| range_annotations(&row.filename, &row.missed_lines, title, message))
            .collect()
    }
}

/// Totals row of a delta report.
#[derive(Debug, Clone, Serialize)]
pub struct DeltaTotal {
    pub total_statements: i64,
    pub total_misses: i64,
    /// Difference of the root line rates.
    pub line_rate: f64,
    pub branch_rate: f64,
}

/// Differences between two reports, ready to be formatted.
#[derive(Debug, Clone, Serialize)]
pub struct DeltaReport {
    /// Files that changed in any way, sorted by name.
    pub files: Vec<FileDiff>,
    pub total: DeltaTotal,
    pub outcome: DiffOutcome,
}

impl DeltaReport {
    pub fn build(diff: &CoberturaDiff) -> Result<Self> {
        let files = diff
            .file_deltas()?
            .into_iter()
            .filter(|f| !is_unchanged(&f.delta))
            .collect();
        Ok(Self {
            files,
            total: DeltaTotal {
                total_statements: diff.total_statements_delta()?,
                total_misses: diff.total_misses_delta()?,
                line_rate: diff.line_rate_delta(),
                branch_rate: diff.branch_rate_delta(),
            },
            outcome: diff.outcome()?,
        })
    }

    #[must_use]
    pub fn format(&self, formatter: &dyn ReportFormatter) -> String {
        formatter.format_delta(self)
    }

    /// One annotation per range of newly uncovered lines.
    pub fn annotations(&self, title: &str, message: &str) -> Vec<Annotation> {
        self.files
            .iter()
            .flat_map(|f| range_annotations(&f.name, f.delta.missed_added(), title, message))
            .collect()
    }
}

fn is_unchanged(delta: &FileDelta) -> bool {
    match delta {
        FileDelta::Changed(c) => {
            c.total_statements == 0
                && c.total_misses == 0
                && c.missed_added.is_empty()
                && c.missed_removed.is_empty()
        }
        _ => false,
    }
}

fn range_annotations(path: &str, lines: &[u32], title: &str, message: &str) -> Vec<Annotation> {
    rangify(lines)
        .into_iter()
        .map(|(start, end)| Annotation {
            path: path.to_string(),
            start_line: start,
            end_line: end,
            title: title.to_string(),
            message: message.to_string(),
        })
        .collect()
}

/// Trait for formatting reports.
pub trait ReportFormatter {
    fn format_summary(&self, report: &SummaryReport) -> String;
    fn format_delta(&self, report: &DeltaReport) -> String;
}

const HEADERS: [&str; 5] = ["Filename", "Stmts", "Miss", "Cover", "Missing"];

fn percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

fn signed(value: i64) -> String {
    if value == 0 {
        "-".to_string()
    } else {
        format!("{value:+}")
    }
}

fn signed_percent(rate: f64) -> String {
    // Below display precision counts as no change.
    if (rate * 100.0).abs() < 0.005 {
        "-".to_string()
    } else {
        format!("{:+.2}%", rate * 100.0)
    }
}

fn ranges_with_sign(lines: &[u32], sign: char) -> Vec<String> {
    rangify(lines)
        .into_iter()
        .map(|(start, end)| {
            if start == end {
                format!("{sign}{start}")
            } else {
                format!("{sign}{start}-{end}")
            }
        })
        .collect()
}

/// `"+6-7, -4-5"`: newly uncovered ranges first, then fixed ones.
pub fn format_missing_delta(added: &[u32], removed: &[u32]) -> String {
    let mut parts = ranges_with_sign(added, '+');
    parts.extend(ranges_with_sign(removed, '-'));
    parts.join(", ")
}

fn summary_cells(report: &SummaryReport) -> Vec<[String; 5]> {
    report
        .files
        .iter()
        .chain(std::iter::once(&report.total))
        .map(|row| {
            [
                row.filename.clone(),
                row.total_statements.to_string(),
                row.total_misses.to_string(),
                percent(row.line_rate),
                row.missing.clone(),
            ]
        })
        .collect()
}

fn delta_cells(report: &DeltaReport) -> Vec<[String; 5]> {
    let mut rows: Vec<[String; 5]> = report
        .files
        .iter()
        .map(|f| match &f.delta {
            FileDelta::Removed { .. } => [
                f.name.clone(),
                signed(f.delta.statements()),
                "-".to_string(),
                "-".to_string(),
                String::new(),
            ],
            FileDelta::Added(c) => [
                f.name.clone(),
                signed(c.total_statements),
                signed(c.total_misses),
                signed_percent(c.line_rate),
                format_missing_delta(&c.missed_added, &c.missed_removed),
            ],
            FileDelta::Changed(c) => [
                f.name.clone(),
                signed(c.total_statements),
                signed(c.total_misses),
                signed_percent(c.line_rate),
                format_missing_delta(&c.missed_added, &c.missed_removed),
            ],
        })
        .collect();
    rows.push([
        "TOTAL".to_string(),
        signed(report.total.total_statements),
        signed(report.total.total_misses),
        signed_percent(report.total.line_rate),
        String::new(),
    ]);
    rows
}

/// Plain text table.
pub struct TextFormatter;

impl TextFormatter {
    fn table(rows: &[[String; 5]]) -> String {
        let mut widths = HEADERS.map(str::len);
        for row in rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let render = |cells: [&str; 5]| -> String {
            let [name, stmts, miss, cover, missing] = cells;
            let line = format!(
                "{name:<w0$}  {stmts:>w1$}  {miss:>w2$}  {cover:>w3$}  {missing}",
                w0 = widths[0],
                w1 = widths[1],
                w2 = widths[2],
                w3 = widths[3],
            );
            line.trim_end().to_string()
        };

        let mut out = String::new();
        writeln!(out, "{}", render(HEADERS)).unwrap();
        let rule = widths.map(|w| "-".repeat(w));
        writeln!(out, "{}", rule.join("  ")).unwrap();
        for row in rows {
            writeln!(out, "{}", render(row.each_ref().map(String::as_str))).unwrap();
        }
        out
    }
}

impl ReportFormatter for TextFormatter {
    fn format_summary(&self, report: &SummaryReport) -> String {
        Self::table(&summary_cells(report))
    }

    fn format_delta(&self, report: &DeltaReport) -> String {
        Self::table(&delta_cells(report))
    }
}

/// Markdown table.
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    fn table(rows: &[[String; 5]]) -> String {
        let mut md = String::new();
        writeln!(md, "| {} |", HEADERS.join(" | ")).unwrap();
        md.push_str("|:-----|------:|-----:|------:|:--------|\n");
        for row in rows {
            let [name, stmts, miss, cover, missing] = row;
            writeln!(md, "| `{name}` | {stmts} | {miss} | {cover} | {missing} |").unwrap();
        }
        md
    }
}

impl ReportFormatter for MarkdownFormatter {
    fn format_summary(&self, report: &SummaryReport) -> String {
        Self::table(&summary_cells(report))
    }

    fn format_delta(&self, report: &DeltaReport) -> String {
        Self::table(&delta_cells(report))
    }
}

/// Delimiter-separated values with a header row.
pub struct CsvFormatter {
    pub delimiter: char,
}

impl CsvFormatter {
    fn field(&self, value: &str) -> String {
        if value.contains(self.delimiter) || value.contains('"') || value.contains('\n') {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }

    fn table(&self, rows: &[[String; 5]]) -> String {
        let sep = self.delimiter.to_string();
        let mut out = String::new();
        writeln!(out, "{}", HEADERS.join(&sep)).unwrap();
        for row in rows {
            let fields: Vec<String> = row.iter().map(|c| self.field(c)).collect();
            writeln!(out, "{}", fields.join(&sep)).unwrap();
        }
        out
    }
}

impl ReportFormatter for CsvFormatter {
    fn format_summary(&self, report: &SummaryReport) -> String {
        self.table(&summary_cells(report))
    }

    fn format_delta(&self, report: &DeltaReport) -> String {
        self.table(&delta_cells(report))
    }
}

/// Pretty-printed JSON of the report structures.
pub struct JsonFormatter;

impl JsonFormatter {
    fn render<T: Serialize>(value: &T) -> String {
        match serde_json::to_string_pretty(value) {
            Ok(mut json) => {
                json.push('\n');
                json
            }
            Err(e) => format!("{{\"error\": \"{e}\"}}\n"),
        }
    }
}

impl ReportFormatter for JsonFormatter {
    fn format_summary(&self, report: &SummaryReport) -> String {
        Self::render(report)
    }

    fn format_delta(&self, report: &DeltaReport) -> String {
        Self::render(report)
    }
}

/// GitHub Actions workflow commands, one per uncovered range.
pub struct GithubAnnotationFormatter {
    /// `notice`, `warning` or `error`.
    pub level: String,
    pub title: String,
    pub message: String,
}

impl GithubAnnotationFormatter {
    fn render(&self, annotations: &[Annotation]) -> String {
        let mut out = String::new();
        for a in annotations {
            writeln!(
                out,
                "::{} file={},line={},endLine={},title={}::{}",
                self.level, a.path, a.start_line, a.end_line, a.title, a.message
            )
            .unwrap();
        }
        out
    }
}

impl ReportFormatter for GithubAnnotationFormatter {
    fn format_summary(&self, report: &SummaryReport) -> String {
        self.render(&report.annotations(&self.title, &self.message))
    }

    fn format_delta(&self, report: &DeltaReport) -> String {
        self.render(&report.annotations(&self.title, &self.message))
    }
}

fn status_marker(status: Option<LineStatus>) -> char {
    match status {
        Some(LineStatus::Hit) => '+',
        Some(LineStatus::Miss) => '-',
        Some(LineStatus::Partial) => '~',
        Some(LineStatus::Unknown) | None => ' ',
    }
}

/// Annotated source of one file: line number, status marker, text.
pub fn format_source(lines: &[Line]) -> String {
    let mut out = String::new();
    for line in lines {
        if line.number == 0 {
            writeln!(out, "{}", line.source).unwrap();
            continue;
        }
        let marker = status_marker(line.status);
        let text = format!("{:>4} {marker} {}", line.number, line.source);
        writeln!(out, "{}", text.trim_end()).unwrap();
    }
    out
}

/// Changed regions of one file, each introduced by an `@@` header. The
/// gutter shows `!` for an edited line, `+`/`-` for coverage gained or lost,
/// followed by the line's current coverage.
pub fn format_hunks(name: &str, hunks: &[Vec<DiffLine>]) -> String {
    let mut out = String::new();
    for hunk in hunks {
        let (Some(first), Some(last)) = (hunk.first(), hunk.last()) else {
            continue;
        };
        writeln!(out, "@@ {name}:{}-{} @@", first.number, last.number).unwrap();
        for line in hunk {
            let gutter = match line.reason {
                Some(ChangeReason::LineEdit) => '!',
                Some(ChangeReason::CovUp) => '+',
                Some(ChangeReason::CovDown) => '-',
                None => ' ',
            };
            let covered = match line.status {
                Some(true) => '+',
                Some(false) => '-',
                None => ' ',
            };
            let text = format!("{:>4} {gutter}{covered} {}", line.number, line.source);
            writeln!(out, "{}", text.trim_end()).unwrap();
        }
    }
    out
}
