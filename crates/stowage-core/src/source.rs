//! Archive input endpoints.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use crate::Result;
use crate::StowageError;

/// Where an unpacker reads its archive bytes from.
///
/// A path can be reopened for every unpack. A caller-supplied reader is
/// taken on the first unpack and dropped (closed) when that run ends; a
/// later unpack fails with [`StowageError::StreamConsumed`].
pub enum ArchiveSource {
    /// Archive file on disk.
    Path(PathBuf),

    /// Already-open stream, present until consumed.
    Reader(Option<Box<dyn Read + Send>>),
}

impl ArchiveSource {
    /// Creates a source from a caller-supplied reader.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self::Reader(Some(Box::new(reader)))
    }

    /// Opens the archive stream.
    ///
    /// # Errors
    ///
    /// Returns [`StowageError::NotFound`] if the archive file does not
    /// exist, [`StowageError::IoAt`] if it cannot be opened, and
    /// [`StowageError::StreamConsumed`] if the reader was already taken.
    pub fn open(&mut self) -> Result<Box<dyn Read + Send>> {
        match self {
            Self::Path(path) => {
                let file = File::open(&*path).map_err(|e| StowageError::at(&*path, e))?;
                Ok(Box::new(file))
            }
            Self::Reader(reader) => reader.take().ok_or(StowageError::StreamConsumed),
        }
    }

    /// Returns the archive path, if this source is a file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Reader(_) => None,
        }
    }
}

impl std::fmt::Debug for ArchiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Reader(reader) => f
                .debug_tuple("Reader")
                .field(&if reader.is_some() { "<open>" } else { "<consumed>" })
                .finish(),
        }
    }
}

impl From<PathBuf> for ArchiveSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ArchiveSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}
