//! Directory creation memoization for unpack runs.

use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::Result;
use crate::StowageError;

/// Creates directories on behalf of a [`DirTracker`].
///
/// The default implementation is [`FsDirCreator`]; tests substitute their
/// own to observe how often directories are created.
pub trait DirCreator {
    /// Creates `path` and any missing ancestors.
    fn create_dir_all(&mut self, path: &Path) -> io::Result<()>;
}

/// Creates directories on the real filesystem with `std::fs::create_dir_all`.
///
/// New directories get mode `0o777` before the process umask is applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDirCreator;

impl DirCreator for FsDirCreator {
    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

impl<D: DirCreator + ?Sized> DirCreator for &mut D {
    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        (**self).create_dir_all(path)
    }
}

/// Remembers which output directories one unpack run has already created.
///
/// A tracker belongs to a single unpack invocation: it is created when the
/// run starts and dropped when it ends, so nothing carries over between
/// runs.
///
/// # Examples
///
/// ```no_run
/// use stowage_core::tracker::DirTracker;
/// use std::path::Path;
///
/// let mut tracker = DirTracker::new();
/// tracker.ensure(Path::new("/tmp/out/a"))?;
/// tracker.ensure(Path::new("/tmp/out/a"))?; // no-op
/// assert_eq!(tracker.created(), 1);
/// # Ok::<(), stowage_core::StowageError>(())
/// ```
#[derive(Debug)]
pub struct DirTracker<D = FsDirCreator> {
    creator: D,
    seen: HashSet<PathBuf>,
}

impl DirTracker<FsDirCreator> {
    /// Creates a tracker backed by the real filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::with_creator(FsDirCreator)
    }
}

impl Default for DirTracker<FsDirCreator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DirCreator> DirTracker<D> {
    /// Creates a tracker that delegates to `creator`.
    pub fn with_creator(creator: D) -> Self {
        Self {
            creator,
            seen: HashSet::new(),
        }
    }

    /// Ensures `dir` exists, creating it the first time it is seen.
    ///
    /// # Errors
    ///
    /// Returns [`StowageError::IoAt`] if the directory cannot be created.
    /// A failed path is not remembered.
    pub fn ensure(&mut self, dir: &Path) -> Result<()> {
        if self.seen.contains(dir) {
            return Ok(());
        }

        self.creator
            .create_dir_all(dir)
            .map_err(|source| StowageError::IoAt {
                path: dir.to_path_buf(),
                source,
            })?;
        debug!(dir = %dir.display(), "created directory");
        self.seen.insert(dir.to_path_buf());
        Ok(())
    }

    /// Number of distinct directories ensured so far.
    #[must_use]
    pub fn created(&self) -> usize {
        self.seen.len()
    }
}
