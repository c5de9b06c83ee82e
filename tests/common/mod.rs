#![allow(dead_code)]

use std::path::{Path, PathBuf};

use covdelta::compare::CoberturaDiff;
use covdelta::coverage::Cobertura;
use covdelta::ingest::{load_cobertura, SourceOptions};

pub fn fixture(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(rel)
}

/// Load `tests/fixtures/<version>/coverage.xml` with its sources next to it.
pub fn load(version: &str) -> Cobertura {
    load_cobertura(
        &fixture(&format!("{version}/coverage.xml")),
        &SourceOptions::default(),
        None,
    )
    .unwrap()
}

pub fn fixture_diff() -> CoberturaDiff {
    CoberturaDiff::new(load("v1"), load("v2"))
}
