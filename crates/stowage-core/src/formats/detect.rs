//! Archive format detection.

use std::path::Path;

use crate::Result;
use crate::StowageError;
use crate::formats::compression::Compression;

/// Archive formats chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    /// Tar archive (uncompressed).
    Tar,
    /// Gzip-compressed tar archive.
    TarGz,
    /// ZIP archive.
    Zip,
}

impl ArchiveType {
    /// Outer compression applied to a tar stream of this type.
    #[must_use]
    pub const fn compression(self) -> Compression {
        match self {
            Self::TarGz => Compression::Gzip,
            Self::Tar | Self::Zip => Compression::None,
        }
    }
}

/// Detects the archive type from a file path.
///
/// Recognizes `.tar`, `.tar.gz`, `.tgz` and `.zip`, case-insensitively. A
/// bare `.gz` is not a tar archive; use
/// [`GzipUnpacker`](crate::formats::gzip::GzipUnpacker) for those.
///
/// # Errors
///
/// Returns [`StowageError::UnsupportedFormat`] for any other name.
pub fn detect_format(path: &Path) -> Result<ArchiveType> {
    let unsupported = || StowageError::UnsupportedFormat {
        path: path.to_path_buf(),
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(unsupported)?;

    match extension.to_ascii_lowercase().as_str() {
        "tar" => Ok(ArchiveType::Tar),
        "tgz" => Ok(ArchiveType::TarGz),
        "gz" => {
            if let Some(stem) = path.file_stem()
                && stem.to_string_lossy().to_ascii_lowercase().ends_with(".tar")
            {
                return Ok(ArchiveType::TarGz);
            }
            Err(unsupported())
        }
        "zip" => Ok(ArchiveType::Zip),
        _ => Err(unsupported()),
    }
}
