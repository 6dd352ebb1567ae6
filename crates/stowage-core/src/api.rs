//! High-level public API for packing and unpacking archives.

use std::path::Path;

use crate::PackConfig;
use crate::PackReport;
use crate::Result;
use crate::UnpackReport;
use crate::formats::Pack;
use crate::formats::TarPacker;
use crate::formats::TarUnpacker;
use crate::formats::Unpack;
use crate::formats::ZipPacker;
use crate::formats::ZipUnpacker;
use crate::formats::detect::ArchiveType;
use crate::formats::detect::detect_format;

/// Packs source files and directories into an archive.
///
/// The format is chosen from the output file extension (`.tar`,
/// `.tar.gz`/`.tgz`, `.zip`); for tar archives it overrides
/// `config.compression`.
///
/// # Arguments
///
/// * `output_path` - Path to the archive to write, replaced if it exists
/// * `sources` - Files and directories to include, in order
/// * `config` - Working directory and compression settings
///
/// # Errors
///
/// Returns an error if:
/// - The extension names no supported format
/// - The configuration is invalid
/// - A source does not exist
/// - I/O operations fail
///
/// # Examples
///
/// ```no_run
/// use stowage_core::PackConfig;
/// use stowage_core::pack_archive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PackConfig::default().with_working_dir("/srv/site");
/// let report = pack_archive("/backups/site.tar.gz", &["public", "config.toml"], &config)?;
/// println!("Packed {} files", report.files_added);
/// # Ok(())
/// # }
/// ```
pub fn pack_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    output_path: P,
    sources: &[Q],
    config: &PackConfig,
) -> Result<PackReport> {
    let output = output_path.as_ref();

    match detect_format(output)? {
        format @ (ArchiveType::Tar | ArchiveType::TarGz) => {
            let config = config.clone().with_compression(format.compression());
            TarPacker::new(output, sources, config).pack()
        }
        ArchiveType::Zip => ZipPacker::new(output, sources, config.clone()).pack(),
    }
}

/// Unpacks an archive into `output_dir`.
///
/// The format is chosen from the archive file extension. Directories are
/// created as needed; existing files are truncated and overwritten.
///
/// # Errors
///
/// Returns an error if:
/// - The extension names no supported format
/// - The archive cannot be opened or is malformed
/// - An entry would land outside `output_dir`
/// - I/O operations fail
///
/// # Examples
///
/// ```no_run
/// use stowage_core::unpack_archive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = unpack_archive("/backups/site.tar.gz", "/srv/restore")?;
/// println!("Extracted {} files", report.files_extracted);
/// # Ok(())
/// # }
/// ```
pub fn unpack_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    output_dir: Q,
) -> Result<UnpackReport> {
    let archive = archive_path.as_ref();
    let output_dir = output_dir.as_ref();

    match detect_format(archive)? {
        format @ (ArchiveType::Tar | ArchiveType::TarGz) => {
            TarUnpacker::new(archive, output_dir, format.compression()).unpack()
        }
        ArchiveType::Zip => ZipUnpacker::new(archive, output_dir).unpack(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::formats::compression::Compression;
    use std::fs;
    use tempfile::TempDir;

    fn source_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("docs/api")).unwrap();
        fs::write(temp.path().join("docs/index.md"), "# index").unwrap();
        fs::write(temp.path().join("docs/api/core.md"), "# core").unwrap();
        temp
    }

    #[test]
    fn test_roundtrip_every_format() {
        for name in ["a.tar", "a.tar.gz", "a.tgz", "a.zip"] {
            let src = source_tree();
            let out = TempDir::new().unwrap();
            let archive = out.path().join(name);

            let config = PackConfig::new().with_working_dir(src.path());
            let packed = pack_archive(&archive, &["docs"], &config).unwrap();
            assert_eq!(packed.files_added, 2, "{name}");

            let dest = out.path().join("restored");
            let unpacked = unpack_archive(&archive, &dest).unwrap();
            assert_eq!(unpacked.files_extracted, 2, "{name}");
            assert_eq!(
                fs::read_to_string(dest.join("docs/api/core.md")).unwrap(),
                "# core"
            );
        }
    }

    #[test]
    fn test_extension_overrides_config_compression() {
        let src = source_tree();
        let out = TempDir::new().unwrap();
        let archive = out.path().join("plain.tar");

        let config = PackConfig::new()
            .with_working_dir(src.path())
            .with_compression(Compression::Gzip);
        pack_archive(&archive, &["docs"], &config).unwrap();

        let data = fs::read(&archive).unwrap();
        assert_ne!(&data[0..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_unsupported_extension() {
        let out = TempDir::new().unwrap();
        let err = pack_archive(out.path().join("a.rar"), &["x"], &PackConfig::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = unpack_archive(out.path().join("a.7z"), out.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
