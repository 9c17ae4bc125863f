use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the public hashing, archiving and extraction
/// operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The root path handed to an operation does not exist.
    /// A dangling symlink is not absent; it serializes as a symlink.
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    /// The object cannot be represented in either serialization
    /// (device node, FIFO, socket, …).
    #[error("unsupported file type at {0}: {1:?}")]
    UnsupportedFileType(PathBuf, std::fs::FileType),

    /// A read, write, stat, open, mkdir, symlink or chmod failed, or a file
    /// body changed size while it was being read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The NAR stream being decoded is not syntactically valid.
    #[error("invalid NAR archive: {0}")]
    Format(String),

    /// An argument outside the supported domain, e.g. an unknown hash
    /// algorithm name.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<crate::nixhash::Error> for Error {
    fn from(e: crate::nixhash::Error) -> Self {
        Error::InvalidArgument(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
