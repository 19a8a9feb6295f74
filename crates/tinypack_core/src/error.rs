//! Build errors

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::resolver::ModuleId;

/// Every way a build can fail. All of them are fatal for the build.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// The entry or a dependency could not be read.
    #[error("cannot read module `{id}` at {}", path.display())]
    SourceNotFound {
        id: ModuleId,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The parser rejected a module, or it uses module syntax we do not bundle.
    #[error("syntax error in `{id}`: {message}")]
    Syntax { id: ModuleId, message: String },

    /// A specifier does not name a file we can bundle (bare package, URL, absolute path).
    #[error("cannot resolve `{specifier}` imported from `{importer}`")]
    UnresolvedImport { importer: String, specifier: String },

    /// The artifact could not be written.
    #[error("cannot write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot serialize module table")]
    Serialize(#[from] serde_json::Error),

    #[error("build task failed")]
    Task(#[from] tokio::task::JoinError),
}

/// Coarse classification used for diagnostics and exit reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SourceNotFound,
    SyntaxError,
    UnresolvedImport,
    IoError,
    Config,
    Internal,
}

impl BundleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BundleError::SourceNotFound { .. } => ErrorKind::SourceNotFound,
            BundleError::Syntax { .. } => ErrorKind::SyntaxError,
            BundleError::UnresolvedImport { .. } => ErrorKind::UnresolvedImport,
            BundleError::Io { .. } => ErrorKind::IoError,
            BundleError::Config(_) => ErrorKind::Config,
            BundleError::Serialize(_) | BundleError::Task(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BundleError::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::SourceNotFound => "SourceNotFound",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::UnresolvedImport => "UnresolvedImport",
            ErrorKind::IoError => "IOError",
            ErrorKind::Config => "Config",
            ErrorKind::Internal => "Internal",
        };
        f.write_str(name)
    }
}

pub type Result<T, E = BundleError> = std::result::Result<T, E>;
