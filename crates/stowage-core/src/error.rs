//! Error types for pack and unpack operations.

use std::io;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `StowageError`.
pub type Result<T> = std::result::Result<T, StowageError>;

/// Coarse classification of a [`StowageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A declared source path does not exist.
    NotFound,
    /// Filesystem or stream failure.
    Io,
    /// Malformed or truncated archive container.
    Format,
    /// Logical misuse of a packer or unpacker.
    State,
    /// Invalid configuration or unusable input path.
    Config,
}

/// Errors that can occur while packing or unpacking archives.
#[derive(Error, Debug)]
pub enum StowageError {
    /// A source path does not exist.
    #[error("source not found: {path}")]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// I/O operation on a known path failed.
    #[error("I/O error at {path}: {source}")]
    IoAt {
        /// The path being operated on.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// Archive is corrupted or invalid.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// The caller-supplied stream was already consumed by a previous unpack.
    #[error("archive stream already consumed")]
    StreamConsumed,

    /// A path cannot be represented as an archive entry name.
    #[error("invalid path: {path}")]
    InvalidPath {
        /// The offending path.
        path: PathBuf,
    },

    /// Compression level outside the supported range.
    #[error("invalid compression level {level}, must be 1-9")]
    InvalidCompressionLevel {
        /// The rejected level.
        level: u8,
    },

    /// Archive format could not be determined from the file name.
    #[error("unsupported archive format: {path}")]
    UnsupportedFormat {
        /// The archive path.
        path: PathBuf,
    },
}

impl StowageError {
    /// Wraps an I/O error with the path it occurred on.
    ///
    /// `NotFound` I/O errors become [`StowageError::NotFound`].
    pub fn at(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::IoAt { path, source }
        }
    }

    /// Classifies an error raised while reading the archive container.
    ///
    /// Decoder and header failures surface from the codecs as `io::Error`
    /// with kinds other than genuine device errors; those are reported as
    /// [`StowageError::InvalidArchive`].
    pub fn from_archive_read(what: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::InvalidData
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::Other => Self::InvalidArchive(format!("{what}: {source}")),
            _ => Self::Io(source),
        }
    }

    /// Returns the kind of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use stowage_core::ErrorKind;
    /// use stowage_core::StowageError;
    ///
    /// let err = StowageError::StreamConsumed;
    /// assert_eq!(err.kind(), ErrorKind::State);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Io(_) | Self::IoAt { .. } => ErrorKind::Io,
            Self::InvalidArchive(_) => ErrorKind::Format,
            Self::StreamConsumed => ErrorKind::State,
            Self::InvalidPath { .. }
            | Self::InvalidCompressionLevel { .. }
            | Self::UnsupportedFormat { .. } => ErrorKind::Config,
        }
    }

    /// Returns `true` if a source path was missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path }
            | Self::IoAt { path, .. }
            | Self::InvalidPath { path }
            | Self::UnsupportedFormat { path } => Some(path),
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for StowageError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::from_archive_read("zip", e),
            other => Self::InvalidArchive(format!("zip: {other}")),
        }
    }
}
