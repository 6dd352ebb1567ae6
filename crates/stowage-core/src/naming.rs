//! Archive entry naming.
//!
//! Entry names are derived from source paths as the caller wrote them.
//! Leading separators are stripped, along with any leading `./` that a
//! walk rooted at `.` produces. Everything after that is kept verbatim,
//! including inner `.`, `..` and doubled separators.
//!
//! | working dir | source      | entry name |
//! |-------------|-------------|------------|
//! | none        | `/tmp/aa/1` | `tmp/aa/1` |
//! | `/tmp/aa`   | `1`         | `1`        |
//! | `/tmp/aa`   | `.`         | `x/y` for `/tmp/aa/x/y` |

use std::borrow::Cow;
use std::path::Component;
use std::path::Path;

use crate::Result;
use crate::StowageError;

/// Computes the archive entry name for a path.
///
/// # Examples
///
/// ```
/// use stowage_core::naming::entry_name;
/// use std::path::Path;
///
/// assert_eq!(entry_name(Path::new("/tmp/aa/1"))?, "tmp/aa/1");
/// assert_eq!(entry_name(Path::new("./dir/file"))?, "dir/file");
/// assert_eq!(entry_name(Path::new("dir/./file"))?, "dir/./file");
/// # Ok::<(), stowage_core::StowageError>(())
/// ```
///
/// # Errors
///
/// Returns [`StowageError::InvalidPath`] if the path is not valid UTF-8 or
/// nothing is left once the leading separators are stripped.
pub fn entry_name(path: &Path) -> Result<String> {
    let invalid = || StowageError::InvalidPath {
        path: path.to_path_buf(),
    };

    // a drive or UNC prefix counts as part of the leading separator run
    let rest = match path.components().next() {
        Some(Component::Prefix(prefix)) => path.strip_prefix(prefix.as_os_str()).unwrap_or(path),
        _ => path,
    };
    let text = rest.to_str().ok_or_else(invalid)?;
    let text: Cow<'_, str> = if cfg!(windows) {
        Cow::Owned(text.replace('\\', "/"))
    } else {
        Cow::Borrowed(text)
    };

    let mut name = text.trim_start_matches('/');
    while let Some(after) = name.strip_prefix("./") {
        name = after.trim_start_matches('/');
    }

    if name.is_empty() || name == "." {
        return Err(invalid());
    }
    Ok(name.to_string())
}

/// Returns `true` if an entry name climbs out of its root via `..`.
pub fn escapes_root(name: &str) -> bool {
    Path::new(name)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
}
