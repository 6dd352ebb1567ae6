//! Helpers shared by the tar and zip packers and unpackers.

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::Result;
use crate::StowageError;
use crate::copy::CopyBuffer;
use crate::copy::CopyError;
use crate::copy::copy_with_buffer;
use crate::naming::entry_name;
use crate::naming::escapes_root;
use crate::source::ArchiveSource;
use crate::tracker::DirCreator;
use crate::tracker::DirTracker;

/// Permission bits restored on extracted files.
const MODE_MASK: u32 = 0o777;

/// Mode used when an archive does not record one.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Prepares the destination of a pack run.
///
/// Removes a stale file at `output` (a missing file is fine) and creates
/// the parent directory chain if it does not exist yet.
pub fn prepare_output(output: &Path) -> Result<()> {
    match std::fs::remove_file(output) {
        Ok(()) => debug!(path = %output.display(), "removed stale archive"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => debug!(path = %output.display(), error = %e, "could not remove stale archive"),
    }

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| StowageError::at(parent, e))?;
    }
    Ok(())
}

/// Maps a copy failure while streaming a source file into an archive.
pub fn pack_copy_error(source: &Path, output: &Path, err: CopyError) -> StowageError {
    match err {
        CopyError::Read(e) => StowageError::at(source, e),
        CopyError::Write(e) => StowageError::at(output, e),
    }
}

/// Computes where an archive entry lands under `dest`.
///
/// Leading separators are stripped so absolute names stay under `dest`;
/// names that climb out with `..` are rejected.
pub fn entry_destination(dest: &Path, raw_name: &Path) -> Result<(String, PathBuf)> {
    let name = entry_name(raw_name).map_err(|_| {
        StowageError::InvalidArchive(format!("unusable entry name: {}", raw_name.display()))
    })?;
    if escapes_root(&name) {
        return Err(StowageError::InvalidArchive(format!(
            "entry escapes output directory: {name}"
        )));
    }
    let path = dest.join(&name);
    Ok((name, path))
}

/// Writes one archive entry to disk.
///
/// Ensures the parent directory through `tracker`, creates or truncates the
/// file with `mode`, streams the payload and closes the file before
/// returning. Returns the number of payload bytes written.
pub fn extract_file<R, D>(
    reader: &mut R,
    dest: &Path,
    raw_name: &Path,
    mode: u32,
    tracker: &mut DirTracker<D>,
    buffer: &mut CopyBuffer,
) -> Result<u64>
where
    R: Read + ?Sized,
    D: DirCreator,
{
    let (name, path) = entry_destination(dest, raw_name)?;

    if let Some(parent) = path.parent() {
        tracker.ensure(parent)?;
    }

    let mut file = create_truncated(&path, mode)?;
    let written = copy_with_buffer(reader, &mut file, buffer).map_err(|e| match e {
        CopyError::Read(e) => StowageError::from_archive_read(&format!("entry {name}"), e),
        CopyError::Write(e) => StowageError::at(&path, e),
    })?;
    restore_mode(&file, &path, mode)?;

    debug!(entry = %name, bytes = written, "extracted file");
    Ok(written)
}

fn create_truncated(path: &Path, mode: u32) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode & MODE_MASK);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path).map_err(|e| StowageError::at(path, e))
}

// open(2) applies the umask and leaves modes of existing files alone
#[cfg(unix)]
fn restore_mode(file: &File, path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(mode & MODE_MASK))
        .map_err(|e| StowageError::at(path, e))
}

#[cfg(not(unix))]
fn restore_mode(_file: &File, _path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Returns the permission bits of a source file.
#[cfg(unix)]
pub fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & MODE_MASK
}

/// Returns the permission bits of a source file.
#[cfg(not(unix))]
pub fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        DEFAULT_FILE_MODE
    }
}

/// Opens an archive source as a seekable file.
///
/// Paths are opened directly. Caller-supplied streams are spooled into an
/// anonymous temporary file first, since the zip central directory sits at
/// the end of the archive.
pub fn open_seekable(source: &mut ArchiveSource, buffer: &mut CopyBuffer) -> Result<File> {
    if let ArchiveSource::Path(path) = source {
        return File::open(&*path).map_err(|e| StowageError::at(&*path, e));
    }

    let mut reader = source.open()?;
    let mut spool = tempfile::tempfile()?;
    let spooled = copy_with_buffer(&mut reader, &mut spool, buffer).map_err(|e| match e {
        CopyError::Read(e) => StowageError::from_archive_read("archive stream", e),
        CopyError::Write(e) => StowageError::Io(e),
    })?;
    spool.seek(SeekFrom::Start(0))?;

    debug!(bytes = spooled, "spooled archive stream");
    Ok(spool)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_output_removes_stale_file() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out.tar");
        std::fs::write(&output, "stale").unwrap();

        prepare_output(&output).unwrap();

        assert!(!output.exists());
    }

    #[test]
    fn test_prepare_output_creates_parents() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("a/b/out.tar");

        prepare_output(&output).unwrap();

        assert!(temp.path().join("a/b").is_dir());
        assert!(!output.exists());
    }

    #[test]
    fn test_prepare_output_bare_file_name() {
        // no parent component at all
        assert!(prepare_output(Path::new("definitely-not-present.tar")).is_ok());
    }

    #[test]
    fn test_entry_destination() {
        let dest = Path::new("/out");
        let (name, path) = entry_destination(dest, Path::new("/etc/passwd")).unwrap();
        assert_eq!(name, "etc/passwd");
        assert_eq!(path, Path::new("/out/etc/passwd"));

        assert!(matches!(
            entry_destination(dest, Path::new("a/../../x")),
            Err(StowageError::InvalidArchive(_))
        ));
    }

    #[test]
    fn test_extract_file_truncates_existing() {
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join("d/f.txt");
        std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
        std::fs::write(&existing, "a much longer previous content").unwrap();

        let mut tracker = DirTracker::new();
        let mut buffer = CopyBuffer::new();
        let written = extract_file(
            &mut Cursor::new(b"new"),
            temp.path(),
            Path::new("d/f.txt"),
            0o644,
            &mut tracker,
            &mut buffer,
        )
        .unwrap();

        assert_eq!(written, 3);
        assert_eq!(std::fs::read(&existing).unwrap(), b"new");
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_file_applies_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let mut tracker = DirTracker::new();
        let mut buffer = CopyBuffer::new();

        for mode in [0o755, 0o600, 0o777] {
            extract_file(
                &mut Cursor::new(b"#!/bin/sh"),
                temp.path(),
                Path::new("bin/run.sh"),
                mode,
                &mut tracker,
                &mut buffer,
            )
            .unwrap();

            let actual = std::fs::metadata(temp.path().join("bin/run.sh"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(actual & 0o777, mode);
        }
        assert_eq!(tracker.created(), 1);
    }

    #[test]
    fn test_open_seekable_spools_reader() {
        let mut source = ArchiveSource::from_reader(Cursor::new(b"zipbytes".to_vec()));
        let mut file = open_seekable(&mut source, &mut CopyBuffer::new()).unwrap();

        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"zipbytes");

        assert!(matches!(
            open_seekable(&mut source, &mut CopyBuffer::new()),
            Err(StowageError::StreamConsumed)
        ));
    }
}
