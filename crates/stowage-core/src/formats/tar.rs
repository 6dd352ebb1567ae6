//! Tar packing and unpacking, optionally gzip-compressed.

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use tar::Archive;
use tar::Builder;
use tar::Header;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::PackConfig;
use crate::PackReport;
use crate::Result;
use crate::StowageError;
use crate::UnpackReport;
use crate::collect::CollectedFile;
use crate::collect::collect_sources;
use crate::copy::CopyBuffer;
use crate::formats::common::extract_file;
use crate::formats::common::prepare_output;
use crate::formats::compression::Compression;
use crate::formats::compression::Encoder;
use crate::formats::compression::decoder;
use crate::formats::traits::Pack;
use crate::formats::traits::Unpack;
use crate::source::ArchiveSource;
use crate::tracker::DirCreator;
use crate::tracker::DirTracker;
use crate::tracker::FsDirCreator;

/// Packs sources into a tar archive.
///
/// # Examples
///
/// ```no_run
/// use stowage_core::PackConfig;
/// use stowage_core::formats::Pack;
/// use stowage_core::formats::compression::Compression;
/// use stowage_core::formats::tar::TarPacker;
///
/// // stores /tmp/aa/1 as "1"
/// let config = PackConfig::default()
///     .with_working_dir("/tmp/aa")
///     .with_compression(Compression::Gzip);
/// let report = TarPacker::new("/tmp/cc/a.tar.gz", &["1"], config).pack()?;
/// println!("packed {} files", report.files_added);
/// # Ok::<(), stowage_core::StowageError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TarPacker {
    output: PathBuf,
    sources: Vec<PathBuf>,
    config: PackConfig,
}

impl TarPacker {
    /// Creates a packer writing `sources` to `output`.
    ///
    /// A relative `output` is resolved against the configured working
    /// directory.
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

impl Pack for TarPacker {
    fn pack(&mut self) -> Result<PackReport> {
        let start = Instant::now();
        self.config.validate()?;
        self.config.check_working_dir()?;

        let output = self.config.resolve(&self.output);
        info!(
            output = %output.display(),
            sources = self.sources.len(),
            compression = ?self.config.compression,
            "packing tar archive"
        );

        prepare_output(&output)?;
        let files = collect_sources(&self.sources, self.config.working_dir.as_deref())?;

        let file = File::create(&output).map_err(|e| StowageError::at(&output, e))?;
        let encoder = Encoder::new(file, self.config.compression, self.config.compression_level);
        let mut builder = Builder::new(encoder);
        let mut report = PackReport::new();

        for collected in &files {
            report.bytes_written += append_file(&mut builder, collected, &output)?;
            report.files_added += 1;
        }

        // tar trailer, then gzip trailer, then the file itself
        let encoder = builder
            .into_inner()
            .map_err(|e| StowageError::at(&output, e))?;
        let file = encoder.finish().map_err(|e| StowageError::at(&output, e))?;
        drop(file);

        report.duration = start.elapsed();
        info!(
            output = %output.display(),
            files = report.files_added,
            bytes = report.bytes_written,
            "tar archive written"
        );
        Ok(report)
    }
}

fn append_file<W: Write>(
    builder: &mut Builder<W>,
    collected: &CollectedFile,
    output: &Path,
) -> Result<u64> {
    let path = &collected.path;
    let file = File::open(path).map_err(|e| StowageError::at(path, e))?;
    let metadata = file.metadata().map_err(|e| StowageError::at(path, e))?;
    let size = metadata.len();

    let mut header = Header::new_gnu();
    header.set_metadata(&metadata);

    // the header already fixed the size; never write past it
    builder
        .append_data(&mut header, &collected.name, file.take(size))
        .map_err(|e| StowageError::at(output, e))?;

    debug!(entry = %collected.name, bytes = size, "added file");
    Ok(size)
}

/// Unpacks a tar archive into a directory.
///
/// # Examples
///
/// ```no_run
/// use stowage_core::formats::Unpack;
/// use stowage_core::formats::compression::Compression;
/// use stowage_core::formats::tar::TarUnpacker;
///
/// let report = TarUnpacker::new("/tmp/dd/a.tar", "/tmp/dd", Compression::None).unpack()?;
/// println!("extracted {} files", report.files_extracted);
/// # Ok::<(), stowage_core::StowageError>(())
/// ```
#[derive(Debug)]
pub struct TarUnpacker {
    source: ArchiveSource,
    dest: PathBuf,
    compression: Compression,
}

impl TarUnpacker {
    /// Creates an unpacker reading the archive file at `archive`.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        archive: P,
        dest: Q,
        compression: Compression,
    ) -> Self {
        Self {
            source: ArchiveSource::Path(archive.as_ref().to_path_buf()),
            dest: dest.as_ref().to_path_buf(),
            compression,
        }
    }

    /// Creates an unpacker reading from an already-open stream.
    ///
    /// The stream is consumed and closed by the first unpack; unpacking
    /// again fails with [`StowageError::StreamConsumed`].
    pub fn from_reader<R, Q>(reader: R, dest: Q, compression: Compression) -> Self
    where
        R: Read + Send + 'static,
        Q: AsRef<Path>,
    {
        Self {
            source: ArchiveSource::from_reader(reader),
            dest: dest.as_ref().to_path_buf(),
            compression,
        }
    }

    /// Unpacks, creating directories through `creator`.
    pub fn unpack_with<D: DirCreator>(&mut self, creator: D) -> Result<UnpackReport> {
        let start = Instant::now();
        info!(
            source = ?self.source,
            dest = %self.dest.display(),
            compression = ?self.compression,
            "unpacking tar archive"
        );

        let stream = self.source.open()?;
        let mut archive = Archive::new(decoder(stream, self.compression));
        let mut tracker = DirTracker::with_creator(creator);
        let mut buffer = CopyBuffer::new();
        let mut report = UnpackReport::new();

        let entries = archive
            .entries()
            .map_err(|e| StowageError::from_archive_read("tar", e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| StowageError::from_archive_read("tar header", e))?;
            let entry_type = entry.header().entry_type();
            let name = entry
                .path()
                .map_err(|e| StowageError::from_archive_read("tar entry name", e))?
                .into_owned();

            // pre-POSIX archives mark directories only by a trailing slash
            let is_dir = entry_type.is_dir()
                || (entry_type.is_file() && entry.path_bytes().ends_with(b"/"));
            if is_dir {
                debug!(entry = %name.display(), "skipping directory entry");
                report.entries_skipped += 1;
                continue;
            }
            if !entry_type.is_file() {
                warn!(entry = %name.display(), kind = ?entry_type, "skipping non-regular entry");
                report.entries_skipped += 1;
                continue;
            }

            let mode = entry
                .header()
                .mode()
                .map_err(|e| StowageError::from_archive_read("tar entry mode", e))?;
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
            "tar archive unpacked"
        );
        Ok(report)
    }
}

impl Unpack for TarUnpacker {
    fn unpack(&mut self) -> Result<UnpackReport> {
        self.unpack_with(FsDirCreator)
    }
}
