//! Zip packing and unpacking.

use std::fs::File;
use std::fs::Metadata;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use tracing::debug;
use tracing::info;
use tracing::warn;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

use crate::PackConfig;
use crate::PackReport;
use crate::Result;
use crate::StowageError;
use crate::UnpackReport;
use crate::collect::CollectedFile;
use crate::collect::collect_sources;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;
use crate::formats::common::DEFAULT_FILE_MODE;
use crate::formats::common::extract_file;
use crate::formats::common::file_mode;
use crate::formats::common::open_seekable;
use crate::formats::common::pack_copy_error;
use crate::formats::common::prepare_output;
use crate::formats::traits::Pack;
use crate::formats::traits::Unpack;
use crate::source::ArchiveSource;
use crate::tracker::DirCreator;
use crate::tracker::DirTracker;
use crate::tracker::FsDirCreator;

/// Deflate level used when the config leaves it unset.
const DEFAULT_DEFLATE_LEVEL: u8 = 6;

const S_IFMT: u32 = 0o170_000;
const S_IFREG: u32 = 0o100_000;

/// Packs sources into a zip archive, deflating every entry.
///
/// The [`PackConfig::compression`] setting is ignored; zip always
/// compresses per entry.
#[derive(Debug, Clone)]
pub struct ZipPacker {
    output: PathBuf,
    sources: Vec<PathBuf>,
    config: PackConfig,
}

impl ZipPacker {
    /// Creates a packer writing `sources` to `output`.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        output: P,
        sources: &[Q],
        config: PackConfig,
    ) -> Self {
        Self {
            output: output.as_ref().to_path_buf(),
            sources: sources.iter().map(|s| s.as_ref().to_path_buf()).collect(),
            config,
        }
    }
}

impl Pack for ZipPacker {
    fn pack(&mut self) -> Result<PackReport> {
        let start = Instant::now();
        self.config.validate()?;
        self.config.check_working_dir()?;

        let output = self.config.resolve(&self.output);
        info!(
            output = %output.display(),
            sources = self.sources.len(),
            "packing zip archive"
        );

        prepare_output(&output)?;
        let files = collect_sources(&self.sources, self.config.working_dir.as_deref())?;

        let file = File::create(&output).map_err(|e| StowageError::at(&output, e))?;
        let mut zip = ZipWriter::new(file);
        let level = self.config.compression_level.unwrap_or(DEFAULT_DEFLATE_LEVEL);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(level)));

        let mut buffer = CopyBuffer::new();
        let mut report = PackReport::new();

        for collected in &files {
            report.bytes_written +=
                append_file(&mut zip, collected, options, &output, &mut buffer)?;
            report.files_added += 1;
        }

        // central directory, then the file itself
        let file = zip.finish().map_err(|e| write_error(&output, e))?;
        drop(file);

        report.duration = start.elapsed();
        info!(
            output = %output.display(),
            files = report.files_added,
            bytes = report.bytes_written,
            "zip archive written"
        );
        Ok(report)
    }
}

fn append_file(
    zip: &mut ZipWriter<File>,
    collected: &CollectedFile,
    options: SimpleFileOptions,
    output: &Path,
    buffer: &mut CopyBuffer,
) -> Result<u64> {
    let path = &collected.path;
    let mut file = File::open(path).map_err(|e| StowageError::at(path, e))?;
    let metadata = file.metadata().map_err(|e| StowageError::at(path, e))?;

    let mut options = options
        .unix_permissions(file_mode(&metadata))
        .large_file(metadata.len() >= u64::from(u32::MAX));
    if let Some(mtime) = zip_mtime(&metadata) {
        options = options.last_modified_time(mtime);
    }
    zip.start_file(collected.name.as_str(), options)
        .map_err(|e| write_error(output, e))?;

    let written = copy_with_buffer(&mut file, zip, buffer)
        .map_err(|e| pack_copy_error(path, output, e))?;

    debug!(entry = %collected.name, bytes = written, "added file");
    Ok(written)
}

/// Zip timestamps are DOS times, so mtimes outside 1980..=2107 are dropped.
fn zip_mtime(metadata: &Metadata) -> Option<zip::DateTime> {
    let modified: chrono::DateTime<chrono::Utc> = metadata.modified().ok()?.into();
    zip::DateTime::try_from(modified.naive_utc()).ok()
}

fn write_error(output: &Path, err: ZipError) -> StowageError {
    match err {
        ZipError::Io(e) => StowageError::at(output, e),
        other => StowageError::from(other),
    }
}

/// Unpacks a zip archive into a directory.
///
/// # Examples
///
/// ```no_run
/// use stowage_core::formats::Unpack;
/// use stowage_core::formats::zip::ZipUnpacker;
///
/// let report = ZipUnpacker::new("/tmp/dd/a.zip", "/tmp/dd").unpack()?;
/// println!("extracted {} files", report.files_extracted);
/// # Ok::<(), stowage_core::StowageError>(())
/// ```
#[derive(Debug)]
pub struct ZipUnpacker {
    source: ArchiveSource,
    dest: PathBuf,
}

impl ZipUnpacker {
    /// Creates an unpacker reading the archive file at `archive`.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(archive: P, dest: Q) -> Self {
        Self {
            source: ArchiveSource::Path(archive.as_ref().to_path_buf()),
            dest: dest.as_ref().to_path_buf(),
        }
    }

    /// Creates an unpacker reading from an already-open stream.
    ///
    /// The stream is spooled to a temporary file, since zip needs random
    /// access. It can be consumed once.
    pub fn from_reader<R, Q>(reader: R, dest: Q) -> Self
    where
        R: Read + Send + 'static,
        Q: AsRef<Path>,
    {
        Self {
            source: ArchiveSource::from_reader(reader),
            dest: dest.as_ref().to_path_buf(),
        }
    }

    /// Unpacks, creating directories through `creator`.
    pub fn unpack_with<D: DirCreator>(&mut self, creator: D) -> Result<UnpackReport> {
        let start = Instant::now();
        info!(
            source = ?self.source,
            dest = %self.dest.display(),
            "unpacking zip archive"
        );

        let mut buffer = CopyBuffer::new();
        let file = open_seekable(&mut self.source, &mut buffer)?;
        let mut archive = ZipArchive::new(file)?;
        let mut tracker = DirTracker::with_creator(creator);
        let mut report = UnpackReport::new();

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let name = PathBuf::from(entry.name());

            if entry.is_dir() {
                debug!(entry = %name.display(), "skipping directory entry");
                report.entries_skipped += 1;
                continue;
            }
            let mode = entry.unix_mode();
            if let Some(mode) = mode
                && mode & S_IFMT != 0
                && mode & S_IFMT != S_IFREG
            {
                warn!(entry = %name.display(), mode = format_args!("{mode:o}"), "skipping non-regular entry");
                report.entries_skipped += 1;
                continue;
            }

            let mode = mode.unwrap_or(DEFAULT_FILE_MODE);
            report.bytes_written +=
                extract_file(&mut entry, &self.dest, &name, mode, &mut tracker, &mut buffer)?;
            report.files_extracted += 1;
        }

        report.directories_created = tracker.created();
        report.duration = start.elapsed();
        info!(
            dest = %self.dest.display(),
            files = report.files_extracted,
            skipped = report.entries_skipped,
            "zip archive unpacked"
        );
        Ok(report)
    }
}

impl Unpack for ZipUnpacker {
    fn unpack(&mut self) -> Result<UnpackReport> {
        self.unpack_with(FsDirCreator)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::test_utils::ZipTestBuilder;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn entry_names(data: Vec<u8>) -> Vec<String> {
        let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_pack_deflates_and_trims_names() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("docs")).unwrap();
        fs::write(src.path().join("docs/a.txt"), "a".repeat(4096)).unwrap();
        fs::write(src.path().join("b.txt"), "b").unwrap();
        let output = out.path().join("a.zip");

        let config = PackConfig::new().with_working_dir(src.path());
        let report = ZipPacker::new(&output, &["docs", "b.txt"], config)
            .pack()
            .unwrap();

        assert_eq!(report.files_added, 2);
        assert_eq!(report.bytes_written, 4097);

        let data = fs::read(&output).unwrap();
        assert!(data.len() < 4096);
        let mut archive = ZipArchive::new(Cursor::new(data.clone())).unwrap();
        assert_eq!(
            archive.by_index(0).unwrap().compression(),
            CompressionMethod::Deflated
        );
        assert_eq!(entry_names(data), vec!["docs/a.txt", "b.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_pack_records_mode() {
        use std::os::unix::fs::PermissionsExt;

        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let script = src.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o750)).unwrap();
        let output = out.path().join("a.zip");

        let config = PackConfig::new().with_working_dir(src.path());
        ZipPacker::new(&output, &["run.sh"], config).pack().unwrap();

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let mode = archive.by_index(0).unwrap().unix_mode().unwrap();
        assert_eq!(mode & 0o777, 0o750);
    }

    #[test]
    fn test_pack_records_mtime() {
        use std::time::Duration;
        use std::time::UNIX_EPOCH;

        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let path = src.path().join("notes.txt");
        fs::write(&path, "n").unwrap();
        // 2021-06-15T12:00:00Z
        let mtime = UNIX_EPOCH + Duration::from_secs(1_623_758_400);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
        let output = out.path().join("a.zip");

        let config = PackConfig::new().with_working_dir(src.path());
        ZipPacker::new(&output, &["notes.txt"], config).pack().unwrap();

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let stored = archive.by_index(0).unwrap().last_modified().unwrap();
        assert_eq!((stored.year(), stored.month(), stored.day()), (2021, 6, 15));
    }

    #[test]
    fn test_pack_missing_source_leaves_no_archive() {
        let src = TempDir::new().unwrap();
        let output = src.path().join("a.zip");
        fs::write(&output, "old").unwrap();

        let config = PackConfig::new().with_working_dir(src.path());
        let err = ZipPacker::new(&output, &["missing"], config)
            .pack()
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(!output.exists());
    }

    #[test]
    fn test_unpack_skips_directories_and_symlinks() {
        let data = ZipTestBuilder::new()
            .add_directory("docs/")
            .add_file("docs/readme.txt", b"hello")
            .add_symlink("docs/link", "readme.txt")
            .build();
        let dest = TempDir::new().unwrap();

        let report = ZipUnpacker::from_reader(Cursor::new(data), dest.path())
            .unpack()
            .unwrap();

        assert_eq!(report.files_extracted, 1);
        assert_eq!(report.entries_skipped, 2);
        assert_eq!(report.directories_created, 1);
        assert_eq!(
            fs::read_to_string(dest.path().join("docs/readme.txt")).unwrap(),
            "hello"
        );
        assert!(!dest.path().join("docs/link").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_unpack_restores_mode() {
        use std::os::unix::fs::PermissionsExt;

        let data = ZipTestBuilder::new()
            .add_file_with_mode("bin/tool", b"x", 0o755)
            .build();
        let dest = TempDir::new().unwrap();

        ZipUnpacker::from_reader(Cursor::new(data), dest.path())
            .unpack()
            .unwrap();

        let mode = fs::metadata(dest.path().join("bin/tool"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_unpack_rejects_parent_traversal() {
        let data = ZipTestBuilder::new().add_file("../escape.txt", b"x").build();
        let dest = TempDir::new().unwrap();

        let err = ZipUnpacker::from_reader(Cursor::new(data), dest.path())
            .unpack()
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_unpack_garbage_is_format_error() {
        let dest = TempDir::new().unwrap();
        let err = ZipUnpacker::from_reader(Cursor::new(b"not a zip".to_vec()), dest.path())
            .unpack()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_unpack_stream_twice_is_state_error() {
        let data = ZipTestBuilder::new().add_file("a", b"a").build();
        let dest = TempDir::new().unwrap();
        let mut unpacker = ZipUnpacker::from_reader(Cursor::new(data), dest.path());

        unpacker.unpack().unwrap();
        assert_eq!(unpacker.unpack().unwrap_err().kind(), ErrorKind::State);
    }

    #[test]
    fn test_unpack_missing_archive() {
        let dest = TempDir::new().unwrap();
        let err = ZipUnpacker::new(dest.path().join("none.zip"), dest.path())
            .unpack()
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
