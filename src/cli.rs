//! Command handler functions for the covdelta CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use anyhow::{bail, Result};
use clap::ValueEnum;

use crate::compare::{CoberturaDiff, DiffOutcome};
use crate::coverage::Cobertura;
use crate::report::{
    self, CsvFormatter, DeltaReport, GithubAnnotationFormatter, JsonFormatter,
    MarkdownFormatter, ReportFormatter, SummaryReport, TextFormatter,
};

/// Output format for `show` and `diff`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Style {
    Text,
    Csv,
    Markdown,
    Json,
    GithubAnnotation,
}

/// Severity of GitHub annotations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AnnotationLevel {
    Notice,
    Warning,
    Error,
}

impl AnnotationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationLevel::Notice => "notice",
            AnnotationLevel::Warning => "warning",
            AnnotationLevel::Error => "error",
        }
    }
}

#[derive(Clone, Debug)]
pub struct OutputOptions {
    pub style: Style,
    /// Field separator for `csv`.
    pub delimiter: char,
    pub annotation_level: AnnotationLevel,
    pub annotation_title: String,
    pub annotation_message: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            style: Style::Text,
            delimiter: ';',
            annotation_level: AnnotationLevel::Notice,
            annotation_title: report::DEFAULT_ANNOTATION_TITLE.to_string(),
            annotation_message: report::DEFAULT_ANNOTATION_MESSAGE.to_string(),
        }
    }
}

impl OutputOptions {
    pub fn formatter(&self) -> Box<dyn ReportFormatter> {
        match self.style {
            Style::Text => Box::new(TextFormatter),
            Style::Csv => Box::new(CsvFormatter {
                delimiter: self.delimiter,
            }),
            Style::Markdown => Box::new(MarkdownFormatter),
            Style::Json => Box::new(JsonFormatter),
            Style::GithubAnnotation => Box::new(GithubAnnotationFormatter {
                level: self.annotation_level.as_str().to_string(),
                title: self.annotation_title.clone(),
                message: self.annotation_message.clone(),
            }),
        }
    }
}

pub fn cmd_show(cobertura: &Cobertura, options: &OutputOptions) -> Result<String> {
    let report = SummaryReport::build(cobertura)?;
    Ok(report.format(options.formatter().as_ref()))
}

/// Annotated source of a single file of the report.
pub fn cmd_show_source(cobertura: &Cobertura, file: &str) -> Result<String> {
    if !cobertura.has_file(file) {
        bail!("'{file}' is not in the coverage report");
    }
    let lines = cobertura.file_source(file)?;
    Ok(report::format_source(&lines))
}

/// Delta table of two reports, plus the verdict deciding the exit status.
pub fn cmd_diff(diff: &CoberturaDiff, options: &OutputOptions) -> Result<(String, DiffOutcome)> {
    let report = DeltaReport::build(diff)?;
    Ok((report.format(options.formatter().as_ref()), report.outcome))
}

/// Change hunks of one file between the two reports.
pub fn cmd_diff_source(diff: &CoberturaDiff, file: &str, context: usize) -> Result<String> {
    if !diff.new_report().has_file(file) {
        bail!("'{file}' is not in the newer coverage report");
    }
    let hunks = diff.file_source_hunks(file, context)?;
    if hunks.is_empty() {
        return Ok(format!("No coverage changes in '{file}'\n"));
    }
    Ok(report::format_hunks(file, &hunks))
}
