//! In-place gzip compression of individual files.
//!
//! [`GzipPacker`] turns `name` into `name.gz` and removes the original;
//! [`GzipUnpacker`] reverses it, restoring the file under the name kept in
//! the gzip header.

use std::ffi::OsString;
use std::fs;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;
use std::time::UNIX_EPOCH;

use flate2::GzBuilder;
use flate2::read::MultiGzDecoder;
use tempfile::NamedTempFile;
use tracing::debug;
use tracing::info;

use crate::PackReport;
use crate::Result;
use crate::StowageError;
use crate::UnpackReport;
use crate::config::check_level;
use crate::copy::CopyBuffer;
use crate::copy::CopyError;
use crate::copy::copy_with_buffer;
use crate::formats::common::pack_copy_error;
use crate::formats::compression::compression_level_to_flate2;
use crate::formats::traits::Pack;
use crate::formats::traits::Unpack;

/// Compresses each source file to `<source>.gz`.
///
/// The gzip header records the source path as given. A source is removed
/// only after its compressed copy was written and closed.
///
/// # Examples
///
/// ```no_run
/// use stowage_core::formats::Pack;
/// use stowage_core::formats::gzip::GzipPacker;
///
/// // writes /var/log/app.log.gz and removes /var/log/app.log
/// GzipPacker::new(&["/var/log/app.log"]).pack()?;
/// # Ok::<(), stowage_core::StowageError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GzipPacker {
    sources: Vec<PathBuf>,
    level: Option<u8>,
}

impl GzipPacker {
    /// Creates a packer for `sources`, processed in order.
    pub fn new<P: AsRef<Path>>(sources: &[P]) -> Self {
        Self {
            sources: sources.iter().map(|s| s.as_ref().to_path_buf()).collect(),
            level: None,
        }
    }

    /// Sets the compression level (1-9).
    #[must_use]
    pub const fn with_compression_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }
}

impl Pack for GzipPacker {
    fn pack(&mut self) -> Result<PackReport> {
        let start = Instant::now();
        check_level(self.level)?;
        info!(sources = self.sources.len(), "gzipping files");

        let mut buffer = CopyBuffer::new();
        let mut report = PackReport::new();
        for source in &self.sources {
            report.bytes_written += compress_file(source, self.level, &mut buffer)?;
            report.files_added += 1;
        }

        report.duration = start.elapsed();
        info!(
            files = report.files_added,
            bytes = report.bytes_written,
            "files gzipped"
        );
        Ok(report)
    }
}

fn compressed_path(source: &Path) -> PathBuf {
    let mut name = OsString::from(source.as_os_str());
    name.push(".gz");
    PathBuf::from(name)
}

fn compress_file(source: &Path, level: Option<u8>, buffer: &mut CopyBuffer) -> Result<u64> {
    let mut input = File::open(source).map_err(|e| StowageError::at(source, e))?;
    let metadata = input.metadata().map_err(|e| StowageError::at(source, e))?;
    if !metadata.is_file() {
        return Err(StowageError::IoAt {
            path: source.to_path_buf(),
            source: std::io::Error::other("not a regular file"),
        });
    }

    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .and_then(|d| u32::try_from(d.as_secs()).ok())
        .unwrap_or(0);

    let output = compressed_path(source);
    let file = File::create(&output).map_err(|e| StowageError::at(&output, e))?;
    let mut encoder = GzBuilder::new()
        .filename(header_name(source))
        .mtime(mtime)
        .write(file, compression_level_to_flate2(level));

    let written = copy_with_buffer(&mut input, &mut encoder, buffer)
        .map_err(|e| pack_copy_error(source, &output, e))?;
    let file = encoder.finish().map_err(|e| StowageError::at(&output, e))?;
    drop(file);
    drop(input);

    fs::remove_file(source).map_err(|e| StowageError::at(source, e))?;
    debug!(source = %source.display(), output = %output.display(), bytes = written, "gzipped file");
    Ok(written)
}

#[cfg(unix)]
fn header_name(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn header_name(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(unix)]
fn stored_path(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn stored_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

fn stored_name(header: Option<&flate2::GzHeader>) -> Option<PathBuf> {
    header
        .and_then(|h| h.filename())
        .and_then(|stored| stored_path(stored).file_name().map(PathBuf::from))
}

/// Restores files compressed by [`GzipPacker`].
///
/// Each `.gz` is decompressed next to itself, under the base name stored in
/// its header (directories in the stored name are ignored). Without a
/// stored name the archive name minus its extension is used. The `.gz` is
/// removed once the restored file is in place.
///
/// Concatenated gzip members are decoded as one stream. An archive whose
/// restored name would be its own name fails with
/// [`StowageError::InvalidPath`] and is left untouched.
#[derive(Debug, Clone)]
pub struct GzipUnpacker {
    sources: Vec<PathBuf>,
}

impl GzipUnpacker {
    /// Creates an unpacker for `sources`, processed in order.
    pub fn new<P: AsRef<Path>>(sources: &[P]) -> Self {
        Self {
            sources: sources.iter().map(|s| s.as_ref().to_path_buf()).collect(),
        }
    }
}

impl Unpack for GzipUnpacker {
    fn unpack(&mut self) -> Result<UnpackReport> {
        let start = Instant::now();
        info!(sources = self.sources.len(), "gunzipping files");

        let mut buffer = CopyBuffer::new();
        let mut report = UnpackReport::new();
        for archive in &self.sources {
            report.bytes_written += decompress_file(archive, &mut buffer)?;
            report.files_extracted += 1;
        }

        report.duration = start.elapsed();
        info!(
            files = report.files_extracted,
            bytes = report.bytes_written,
            "files gunzipped"
        );
        Ok(report)
    }
}

fn decompress_file(archive: &Path, buffer: &mut CopyBuffer) -> Result<u64> {
    let input = File::open(archive).map_err(|e| StowageError::at(archive, e))?;
    let permissions = input
        .metadata()
        .map_err(|e| StowageError::at(archive, e))?
        .permissions();
    let dir = match archive.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // decode next to the target so the final rename stays on one volume
    let mut spool = NamedTempFile::new_in(dir).map_err(|e| StowageError::at(dir, e))?;
    let mut decoder = MultiGzDecoder::new(input);
    // reading on replaces the header with that of the last member
    let first_name = stored_name(decoder.header());
    let written =
        copy_with_buffer(&mut decoder, spool.as_file_mut(), buffer).map_err(|e| match e {
            CopyError::Read(e) => {
                StowageError::from_archive_read(&format!("gzip {}", archive.display()), e)
            }
            CopyError::Write(e) => StowageError::at(dir, e),
        })?;

    let name = first_name
        .or_else(|| stored_name(decoder.header()))
        .or_else(|| archive.file_stem().map(PathBuf::from))
        .ok_or_else(|| StowageError::InvalidPath {
            path: archive.to_path_buf(),
        })?;
    drop(decoder);

    // restoring onto the archive itself would lose both copies
    if Some(name.as_os_str()) == archive.file_name() {
        return Err(StowageError::InvalidPath {
            path: archive.to_path_buf(),
        });
    }

    let target = dir.join(name);
    spool
        .as_file()
        .set_permissions(permissions)
        .map_err(|e| StowageError::at(&target, e))?;
    spool
        .persist(&target)
        .map_err(|e| StowageError::at(&target, e.error))?;

    fs::remove_file(archive).map_err(|e| StowageError::at(archive, e))?;
    debug!(archive = %archive.display(), output = %target.display(), bytes = written, "gunzipped file");
    Ok(written)
}
