//! Streaming tar, tar.gz and zip packing and unpacking.
//!
//! `stowage-core` packs a list of files and directories into a single
//! archive and restores such archives into a directory tree. Entries are
//! streamed one at a time, names are stored relative to an optional working
//! directory, and permission bits round-trip.
//!
//! # Examples
//!
//! ```no_run
//! use stowage_core::PackConfig;
//! use stowage_core::pack_archive;
//! use stowage_core::unpack_archive;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // stores /tmp/aa/1 as "1"
//! let config = PackConfig::default().with_working_dir("/tmp/aa");
//! pack_archive("/tmp/cc/a.tar.gz", &["1"], &config)?;
//!
//! let report = unpack_archive("/tmp/cc/a.tar.gz", "/tmp/dd")?;
//! println!("Extracted {} files", report.files_extracted);
//! # Ok(())
//! # }
//! ```
//!
//! The packers and unpackers in [`formats`] expose the same operations
//! with explicit format selection, caller-supplied input streams and
//! per-file gzip.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod collect;
pub mod config;
pub mod copy;
pub mod error;
pub mod formats;
pub mod naming;
pub mod report;
pub mod source;
pub mod tracker;

#[doc(hidden)]
pub mod test_utils;

// Re-export main API types
pub use api::pack_archive;
pub use api::unpack_archive;
pub use config::PackConfig;
pub use error::ErrorKind;
pub use error::Result;
pub use error::StowageError;
pub use report::PackReport;
pub use report::UnpackReport;
