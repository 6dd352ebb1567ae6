//! Archive format implementations.

pub mod common;
pub mod compression;
pub mod detect;
pub mod gzip;
pub mod tar;
pub mod traits;
pub mod zip;

pub use gzip::GzipPacker;
pub use gzip::GzipUnpacker;
pub use tar::TarPacker;
pub use tar::TarUnpacker;
pub use traits::Pack;
pub use traits::Unpack;
pub use zip::ZipPacker;
pub use zip::ZipUnpacker;
