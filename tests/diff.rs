mod common;

use covdelta::cli::{cmd_diff, cmd_diff_source, OutputOptions, Style};
use covdelta::compare::{DiffOutcome, FileDelta};
use covdelta::model::ChangeReason;

#[test]
fn files_are_sorted_union() {
    let diff = common::fixture_diff();
    assert_eq!(diff.files(), vec!["app.py", "legacy.py", "new.py", "util.py"]);
}

#[test]
fn per_file_deltas() {
    let diff = common::fixture_diff();

    let Some(FileDelta::Changed(app)) = diff.file_delta("app.py").unwrap() else {
        panic!("app.py should be in both reports");
    };
    assert_eq!(app.total_statements, 1);
    assert_eq!(app.total_misses, 1);
    assert_eq!(app.missed_added, vec![6, 7]);
    assert_eq!(app.missed_removed, vec![4, 5]);

    let Some(FileDelta::Changed(util)) = diff.file_delta("util.py").unwrap() else {
        panic!("util.py should be in both reports");
    };
    assert_eq!(util.total_statements, 0);
    assert_eq!(util.total_misses, -1);
    assert!(util.missed_added.is_empty());
    assert_eq!(util.missed_removed, vec![3]);

    let Some(FileDelta::Added(new)) = diff.file_delta("new.py").unwrap() else {
        panic!("new.py should only be in the newer report");
    };
    assert_eq!(new.total_statements, 2);
    assert_eq!(new.total_misses, 1);
    assert_eq!(new.missed_added, vec![2]);

    let legacy = diff.file_delta("legacy.py").unwrap().unwrap();
    assert_eq!(legacy, FileDelta::Removed { total_statements: 2 });
    assert_eq!(legacy.statements(), -2);
}

#[test]
fn totals_and_predicates() {
    let diff = common::fixture_diff();
    assert_eq!(diff.total_statements_delta().unwrap(), 1);
    assert_eq!(diff.total_misses_delta().unwrap(), 0);
    assert!(diff.line_rate_delta() > 0.0);
    assert!(diff.has_better_coverage());
    assert!(!diff.has_all_changes_covered().unwrap());
    assert_eq!(diff.outcome().unwrap(), DiffOutcome::NotAllChangesCovered);
    assert_eq!(diff.outcome().unwrap().exit_code(), 3);
}

#[test]
fn reconciled_source_view() {
    let diff = common::fixture_diff();
    let lines = diff.file_source("app.py").unwrap();
    let marks: Vec<_> = lines.iter().map(|l| (l.number, l.status, l.reason)).collect();
    assert_eq!(
        marks,
        vec![
            (1, None, None),
            (2, None, None),
            (3, None, None),
            (4, Some(true), Some(ChangeReason::CovUp)),
            (5, Some(true), Some(ChangeReason::CovUp)),
            (6, Some(false), Some(ChangeReason::LineEdit)),
            (7, Some(false), Some(ChangeReason::CovDown)),
        ]
    );
    assert_eq!(lines[5].source, "    name = name.strip()");
}

#[test]
fn added_file_source_is_all_edits() {
    let diff = common::fixture_diff();
    let lines = diff.file_source("new.py").unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.reason == Some(ChangeReason::LineEdit)));
    assert_eq!(lines[0].status, Some(true));
    assert_eq!(lines[1].status, Some(false));
}

#[test]
fn hunks_with_and_without_context() {
    let diff = common::fixture_diff();

    let hunks = diff.file_source_hunks("app.py", 3).unwrap();
    assert_eq!(hunks.len(), 1);
    assert_eq!(hunks[0].len(), 7);

    let hunks = diff.file_source_hunks("app.py", 0).unwrap();
    assert_eq!(hunks.len(), 1);
    let numbers: Vec<u32> = hunks[0].iter().map(|l| l.number).collect();
    assert_eq!(numbers, vec![4, 5, 6, 7]);

    let hunks = diff.file_source_hunks("util.py", 1).unwrap();
    let numbers: Vec<u32> = hunks[0].iter().map(|l| l.number).collect();
    assert_eq!(numbers, vec![2, 3, 4]);
}

#[test]
fn diff_text_report() {
    let diff = common::fixture_diff();
    let (out, outcome) = cmd_diff(&diff, &OutputOptions::default()).unwrap();
    assert_eq!(outcome, DiffOutcome::NotAllChangesCovered);

    let row = |name: &str| -> Vec<String> {
        out.lines()
            .find(|l| l.starts_with(name))
            .unwrap()
            .split("  ")
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    };
    assert_eq!(row("app.py"), vec!["app.py", "+1", "+1", "-13.33%", "+6-7, -4-5"]);
    assert_eq!(row("util.py"), vec!["util.py", "-", "-1", "+16.67%", "-3"]);
    assert_eq!(row("new.py"), vec!["new.py", "+2", "+1", "+50.00%", "+2"]);
    assert_eq!(row("legacy.py"), vec!["legacy.py", "-2", "-", "-"]);
    assert_eq!(row("TOTAL"), vec!["TOTAL", "+1", "-", "+2.00%"]);
}

#[test]
fn diff_annotations_cover_new_misses_only() {
    let diff = common::fixture_diff();
    let options = OutputOptions {
        style: Style::GithubAnnotation,
        ..Default::default()
    };
    let (out, _) = cmd_diff(&diff, &options).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "::notice file=app.py,line=6,endLine=7,title=Missing coverage::Line missing coverage",
            "::notice file=new.py,line=2,endLine=2,title=Missing coverage::Line missing coverage",
        ]
    );
}

#[test]
fn diff_json_report() {
    let diff = common::fixture_diff();
    let options = OutputOptions {
        style: Style::Json,
        ..Default::default()
    };
    let (out, _) = cmd_diff(&diff, &options).unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["outcome"], "not-all-changes-covered");
    assert_eq!(value["files"].as_array().unwrap().len(), 4);
    assert_eq!(value["files"][1]["name"], "legacy.py");
    assert_eq!(value["files"][1]["kind"], "removed");
}

#[test]
fn diff_source_view() {
    let diff = common::fixture_diff();
    let out = cmd_diff_source(&diff, "app.py", 1).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "@@ app.py:3-7 @@");
    assert_eq!(lines[2], "   4 ++     if not name:");
    assert_eq!(lines[4], "   6 !-     name = name.strip()");
    assert_eq!(lines[5], "   7 --     return \"hello \" + name");
}

#[test]
fn identical_reports_have_nothing_to_show() {
    let diff = covdelta::compare::CoberturaDiff::new(common::load("v1"), common::load("v1"));
    assert_eq!(diff.outcome().unwrap(), DiffOutcome::AllChangesCovered);
    let out = cmd_diff_source(&diff, "app.py", 3).unwrap();
    assert_eq!(out, "No coverage changes in 'app.py'\n");
}
