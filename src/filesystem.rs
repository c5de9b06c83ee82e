//! Locating the source files a report refers to.
//!
//! A [`FileSystem`] resolves a file name from the report to its text. Sources
//! can live in a directory, inside a zip archive, or at a git revision; the
//! rest of the crate only talks to the trait.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{CovdeltaError, Result};

/// A place source files can be read from.
pub trait FileSystem {
    /// Whether `name` can be opened.
    fn has_file(&self, name: &str) -> bool;

    /// Open `name` for reading. Fails with [`CovdeltaError::FileNotFound`]
    /// when the file is absent.
    fn open(&self, name: &str) -> Result<Box<dyn BufRead + '_>>;

    /// Read the whole file as lines, without line terminators.
    fn source_lines(&self, name: &str) -> Result<Vec<String>> {
        let reader = self.open(name)?;
        Ok(reader.lines().collect::<std::io::Result<Vec<_>>>()?)
    }
}

fn join_prefix(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) if !p.trim_end_matches('/').is_empty() => {
            format!("{}/{}", p.trim_end_matches('/'), name)
        }
        _ => name.to_string(),
    }
}

/// Sources in a directory on disk.
pub struct DirectoryFileSystem {
    root: PathBuf,
    prefix: Option<String>,
}

impl DirectoryFileSystem {
    pub fn new(root: impl Into<PathBuf>, prefix: Option<&str>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.map(str::to_string),
        }
    }

    fn real_path(&self, name: &str) -> PathBuf {
        self.root.join(join_prefix(self.prefix.as_deref(), name))
    }
}

impl FileSystem for DirectoryFileSystem {
    fn has_file(&self, name: &str) -> bool {
        self.real_path(name).is_file()
    }

    fn open(&self, name: &str) -> Result<Box<dyn BufRead + '_>> {
        let path = self.real_path(name);
        match File::open(&path) {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CovdeltaError::FileNotFound {
                    path: path.display().to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Sources stored in a zip archive. The archive is reopened for every read.
pub struct ZipFileSystem {
    archive: PathBuf,
    prefix: Option<String>,
}

impl ZipFileSystem {
    pub fn new(archive: impl Into<PathBuf>, prefix: Option<&str>) -> Self {
        Self {
            archive: archive.into(),
            prefix: prefix.map(str::to_string),
        }
    }

    fn open_archive(&self) -> Result<ZipArchive<File>> {
        let file = File::open(&self.archive)?;
        Ok(ZipArchive::new(file)?)
    }
}

impl FileSystem for ZipFileSystem {
    fn has_file(&self, name: &str) -> bool {
        let member = join_prefix(self.prefix.as_deref(), name);
        let Ok(mut archive) = self.open_archive() else {
            return false;
        };
        // Bound before returning so the entry is dropped ahead of the archive.
        let found = archive.by_name(&member).is_ok();
        found
    }

    fn open(&self, name: &str) -> Result<Box<dyn BufRead + '_>> {
        let member = join_prefix(self.prefix.as_deref(), name);
        let mut archive = self.open_archive()?;
        let mut buf = Vec::new();
        match archive.by_name(&member) {
            Ok(mut entry) => {
                entry.read_to_end(&mut buf)?;
            }
            Err(ZipError::FileNotFound) => {
                return Err(CovdeltaError::FileNotFound {
                    path: format!("{}:{}", self.archive.display(), member),
                });
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Box::new(Cursor::new(buf)))
    }
}

/// Sources at a given revision of a git repository, read with `git show`.
pub struct GitFileSystem {
    repo: PathBuf,
    rev: String,
    prefix: Option<String>,
}

impl GitFileSystem {
    pub fn new(repo: impl Into<PathBuf>, rev: &str, prefix: Option<&str>) -> Self {
        Self {
            repo: repo.into(),
            rev: rev.to_string(),
            prefix: prefix.map(str::to_string),
        }
    }

    fn object(&self, name: &str) -> String {
        format!("{}:{}", self.rev, join_prefix(self.prefix.as_deref(), name))
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.repo);
        cmd
    }
}

impl FileSystem for GitFileSystem {
    fn has_file(&self, name: &str) -> bool {
        let object = self.object(name);
        self.git()
            .args(["cat-file", "-e", object.as_str()])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn open(&self, name: &str) -> Result<Box<dyn BufRead + '_>> {
        let object = self.object(name);
        let output = self
            .git()
            .args(["show", object.as_str()])
            .output()
            .map_err(|e| CovdeltaError::Git(format!("failed to run git show: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(%object, stderr = %stderr.trim(), "git show failed");
            return Err(CovdeltaError::FileNotFound { path: object });
        }

        Ok(Box::new(Cursor::new(output.stdout)))
    }
}

/// Pick a file system for a source descriptor: a git revision when `rev`
/// is given, a zip archive when `source` is a `.zip` file, else a directory.
pub fn filesystem_factory(
    source: &Path,
    prefix: Option<&str>,
    rev: Option<&str>,
) -> Box<dyn FileSystem> {
    if let Some(rev) = rev {
        debug!(repo = %source.display(), rev, "using git sources");
        return Box::new(GitFileSystem::new(source, rev, prefix));
    }

    let is_zip = source
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
    if is_zip && source.is_file() {
        debug!(archive = %source.display(), "using zip sources");
        return Box::new(ZipFileSystem::new(source, prefix));
    }

    debug!(root = %source.display(), "using directory sources");
    Box::new(DirectoryFileSystem::new(source, prefix))
}
