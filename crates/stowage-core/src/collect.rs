//! Source path collection.
//!
//! Expands the caller's source list into a flat, ordered list of regular
//! files, each paired with the entry name it will be stored under.

use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use walkdir::WalkDir;

use crate::Result;
use crate::StowageError;
use crate::naming::entry_name;

/// A regular file selected for packing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedFile {
    /// Filesystem path to open (resolved against the base directory).
    pub path: PathBuf,

    /// Name stored in the archive.
    pub name: String,
}

/// Collects all regular files reachable from `sources`.
///
/// Relative sources are resolved against `base` when one is given; entry
/// names are always computed from the source as written, so a source `1`
/// under base `/tmp/aa` is stored as `1`.
///
/// Directories are walked depth-first with entries sorted by file name.
/// Every path is classified with `stat` semantics: symlinks to files are
/// collected, symlinks to directories are not descended into, and
/// non-regular files are skipped. Duplicate sources are not merged.
///
/// # Examples
///
/// ```no_run
/// use stowage_core::collect::collect_sources;
/// use std::path::Path;
///
/// let files = collect_sources(&["."], Some(Path::new("/srv/data")))?;
/// for file in &files {
///     println!("{} -> {}", file.path.display(), file.name);
/// }
/// # Ok::<(), stowage_core::StowageError>(())
/// ```
///
/// # Errors
///
/// Returns [`StowageError::NotFound`] for the first missing source or
/// dangling symlink, and propagates the first traversal error.
pub fn collect_sources<P: AsRef<Path>>(
    sources: &[P],
    base: Option<&Path>,
) -> Result<Vec<CollectedFile>> {
    let mut files = Vec::new();

    for source in sources {
        let source = source.as_ref();
        let resolved = match base {
            Some(base) => base.join(source),
            None => source.to_path_buf(),
        };

        let metadata =
            std::fs::metadata(&resolved).map_err(|e| StowageError::at(&resolved, e))?;

        if !metadata.is_dir() {
            if metadata.is_file() {
                files.push(CollectedFile {
                    name: entry_name(source)?,
                    path: resolved,
                });
            } else {
                debug!(path = %resolved.display(), "skipping non-regular source");
            }
            continue;
        }

        collect_directory(source, &resolved, &mut files)?;
    }

    Ok(files)
}

fn collect_directory(source: &Path, root: &Path, files: &mut Vec<CollectedFile>) -> Result<()> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1);

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        let path = entry.path();

        // symlinks are classified by their target
        let metadata = std::fs::metadata(path).map_err(|e| StowageError::at(path, e))?;
        if !metadata.is_file() {
            continue;
        }

        let relative = path.strip_prefix(root).map_err(|_| StowageError::InvalidPath {
            path: path.to_path_buf(),
        })?;
        files.push(CollectedFile {
            name: entry_name(&source.join(relative))?,
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

fn walk_error(root: &Path, err: walkdir::Error) -> StowageError {
    let path = err.path().unwrap_or(root).to_path_buf();
    match err.into_io_error() {
        Some(io) => StowageError::at(path, io),
        None => StowageError::IoAt {
            path,
            source: std::io::Error::other("filesystem loop detected"),
        },
    }
}
