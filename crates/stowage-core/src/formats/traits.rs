//! Common traits for packers and unpackers.

use crate::PackReport;
use crate::Result;
use crate::UnpackReport;

/// Something that writes an archive (or compressed files) from sources.
pub trait Pack {
    /// Runs the pack operation.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; partial output is left on disk.
    fn pack(&mut self) -> Result<PackReport>;
}

/// Something that restores files from an archive.
pub trait Unpack {
    /// Runs the unpack operation.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; files already extracted stay on
    /// disk.
    fn unpack(&mut self) -> Result<UnpackReport>;
}
