use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};

use crate::coverage::Cobertura;
use crate::error::Result;
use crate::filesystem::filesystem_factory;
use crate::model::CoverageData;
use crate::parsers::cobertura::CoberturaParser;
use crate::parsers::Parser;

/// Where the sources of a report live.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// Directory, zip archive or git repository. Defaults to the directory
    /// holding the report.
    pub source: Option<PathBuf>,
    /// Prefix joined in front of every file name before lookup.
    pub prefix: Option<String>,
    /// Git revision; makes `source` a repository.
    pub rev: Option<String>,
    /// Load the report without any file system.
    pub disabled: bool,
}

/// Read and parse a Cobertura XML file.
pub fn load_report(path: &Path) -> Result<CoverageData> {
    let content = std::fs::read(path)?;
    let data = CoberturaParser.parse(&content)?;
    info!(
        report = %path.display(),
        files = data.files.len(),
        line_rate = data.line_rate,
        "loaded coverage report"
    );
    Ok(data)
}

/// Load a report and attach the file system its sources are read from.
pub fn load_cobertura(
    path: &Path,
    sources: &SourceOptions,
    ignore: Option<&Regex>,
) -> Result<Cobertura> {
    let mut cobertura = Cobertura::new(load_report(path)?);

    if let Some(pattern) = ignore {
        cobertura = cobertura.with_ignore_regex(pattern);
        debug!(%pattern, remaining = cobertura.files().len(), "applied ignore pattern");
    }

    if sources.disabled {
        return Ok(cobertura);
    }

    let root = match &sources.source {
        Some(source) => source.clone(),
        None => path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
    };
    let fs = filesystem_factory(&root, sources.prefix.as_deref(), sources.rev.as_deref());
    Ok(cobertura.with_filesystem(fs))
}
