//! Configuration for pack operations.

use std::path::Path;
use std::path::PathBuf;

use crate::Result;
use crate::StowageError;
use crate::formats::compression::Compression;

/// Configuration shared by the tar and zip packers.
///
/// # Examples
///
/// ```
/// use stowage_core::PackConfig;
/// use stowage_core::formats::compression::Compression;
///
/// let config = PackConfig::default()
///     .with_working_dir("/srv/data")
///     .with_compression(Compression::Gzip)
///     .with_compression_level(9);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackConfig {
    /// Base directory for relative sources and a relative output path.
    ///
    /// Entry names are computed from sources as written, so sources given
    /// relative to this directory are stored without its prefix.
    ///
    /// Default: `None` (sources are used as given).
    pub working_dir: Option<PathBuf>,

    /// Outer compression for tar archives. Ignored by the zip packer.
    ///
    /// Default: `Compression::None`.
    pub compression: Compression,

    /// Compression level (1-9) for gzip and zip deflate.
    ///
    /// Default: `None` (codec default, level 6).
    pub compression_level: Option<u8>,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            compression: Compression::None,
            compression_level: None,
        }
    }
}

impl PackConfig {
    /// Creates a new `PackConfig` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the working directory. An empty path disables it.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.working_dir = if dir.as_os_str().is_empty() {
            None
        } else {
            Some(dir)
        };
        self
    }

    /// Sets the tar compression.
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the compression level. Checked by [`PackConfig::validate`].
    #[must_use]
    pub fn with_compression_level(mut self, level: u8) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StowageError::InvalidCompressionLevel`] if a level is set
    /// outside 1-9.
    pub fn validate(&self) -> Result<()> {
        check_level(self.compression_level)
    }

    /// Resolves `path` against the working directory if it is relative.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.working_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Checks that the working directory, if set, is an existing directory.
    pub(crate) fn check_working_dir(&self) -> Result<()> {
        let Some(dir) = &self.working_dir else {
            return Ok(());
        };
        let metadata = std::fs::metadata(dir).map_err(|e| StowageError::at(dir, e))?;
        if metadata.is_dir() {
            Ok(())
        } else {
            Err(StowageError::IoAt {
                path: dir.clone(),
                source: std::io::Error::other("working directory is not a directory"),
            })
        }
    }
}

/// Rejects a compression level outside 1-9.
pub(crate) fn check_level(level: Option<u8>) -> Result<()> {
    match level {
        Some(level) if !(1..=9).contains(&level) => {
            Err(StowageError::InvalidCompressionLevel { level })
        }
        _ => Ok(()),
    }
}
