mod common;

use covdelta::cli::{cmd_show, cmd_show_source, OutputOptions, Style};
use covdelta::model::LineStatus;

#[test]
fn file_aggregates() {
    let cob = common::load("v1");
    assert_eq!(cob.files(), vec!["app.py", "util.py", "legacy.py"]);

    let app = cob.aggregate("app.py").unwrap();
    assert_eq!(app.total_statements, 5);
    assert_eq!(app.total_misses, 1);
    assert_eq!(app.total_hits, 4);
    assert_eq!(app.line_rate(), 0.8);

    let totals = cob.report_aggregate().unwrap();
    assert_eq!(totals.total_statements, 13);
    assert_eq!(totals.total_misses, 4);
    assert_eq!(totals.line_rate, 0.69);
}

#[test]
fn missed_ranges_mark_partial_lines() {
    let cob = common::load("v1");
    assert_eq!(cob.missing_ranges("app.py").unwrap(), "~4, 5");
    assert_eq!(cob.missing_ranges("util.py").unwrap(), "3, 5");
    assert_eq!(cob.missed_statements("app.py").unwrap(), vec![5]);
    assert_eq!(cob.hit_statements("app.py").unwrap(), vec![1, 3, 4, 6]);
}

#[test]
fn annotated_source() {
    let cob = common::load("v1");
    let lines = cob.file_source("app.py").unwrap();
    let statuses: Vec<_> = lines.iter().map(|l| l.status).collect();
    assert_eq!(
        statuses,
        vec![
            Some(LineStatus::Hit),
            Some(LineStatus::Hit),
            Some(LineStatus::Hit),
            Some(LineStatus::Partial),
            Some(LineStatus::Miss),
            Some(LineStatus::Hit),
        ]
    );
    assert_eq!(lines[2].source, "def greet(name):");
}

#[test]
fn show_text_report() {
    let out = cmd_show(&common::load("v1"), &OutputOptions::default()).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[2].starts_with("app.py"));
    assert!(lines[2].ends_with("80.00%  ~4, 5"));
    assert!(lines[5].starts_with("TOTAL"));
    assert!(lines[5].ends_with("69.00%"));
}

#[test]
fn show_markdown_report() {
    let options = OutputOptions {
        style: Style::Markdown,
        ..Default::default()
    };
    let out = cmd_show(&common::load("v1"), &options).unwrap();
    assert!(out.contains("| `util.py` | 6 | 2 | 66.67% | 3, 5 |"));
}

#[test]
fn show_github_annotations() {
    let options = OutputOptions {
        style: Style::GithubAnnotation,
        ..Default::default()
    };
    let out = cmd_show(&common::load("v1"), &options).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "::notice file=app.py,line=4,endLine=5,title=Missing coverage::Line missing coverage",
            "::notice file=util.py,line=3,endLine=3,title=Missing coverage::Line missing coverage",
            "::notice file=util.py,line=5,endLine=5,title=Missing coverage::Line missing coverage",
            "::notice file=legacy.py,line=2,endLine=2,title=Missing coverage::Line missing coverage",
        ]
    );
}

#[test]
fn show_source_view() {
    let out = cmd_show_source(&common::load("v1"), "app.py").unwrap();
    assert_eq!(
        out,
        "   1 + import os\n\
         \x20  2 +\n\
         \x20  3 + def greet(name):\n\
         \x20  4 ~     if not name:\n\
         \x20  5 -         return \"nobody\"\n\
         \x20  6 +     return \"hello \" + name\n"
    );
}

#[test]
fn missing_source_file_is_reported_inline() {
    let dir = tempfile::tempdir().unwrap();
    let cob = covdelta::ingest::load_cobertura(
        &common::fixture("v1/coverage.xml"),
        &covdelta::ingest::SourceOptions {
            source: Some(dir.path().to_path_buf()),
            ..Default::default()
        },
        None,
    )
    .unwrap();
    let out = cmd_show_source(&cob, "app.py").unwrap();
    assert!(out.trim_end().ends_with("app.py not found"));
}
