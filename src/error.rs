use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovdeltaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error at position {position}: {source}")]
    Xml {
        source: quick_xml::Error,
        position: usize,
    },

    #[error("Malformed coverage report: {0}")]
    MalformedReport(String),

    /// Raised by a file system when the requested source is absent.
    #[error("{path} not found")]
    FileNotFound { path: String },

    /// Annotated source was requested but no file system was configured.
    #[error("No source file system configured; pass --source to locate source files")]
    MissingFileSystem,

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("git error: {0}")]
    Git(String),
}

pub type Result<T> = std::result::Result<T, CovdeltaError>;
