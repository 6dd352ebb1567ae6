//! Compression layer for tar archives.
//!
//! Zip archives compress each entry themselves and never use this layer.

use std::io::Read;
use std::io::Write;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

/// Outer compression applied to a tar stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Plain tar.
    #[default]
    None,

    /// Gzip-wrapped tar (`.tar.gz`, `.tgz`).
    Gzip,
}

impl Compression {
    /// Returns `Gzip` when `compressed` is true, `None` otherwise.
    #[must_use]
    pub const fn from_flag(compressed: bool) -> Self {
        if compressed { Self::Gzip } else { Self::None }
    }

    /// Returns `true` if a compression layer is applied.
    #[must_use]
    pub const fn is_compressed(self) -> bool {
        matches!(self, Self::Gzip)
    }

    /// Returns the typical tar file extension for this compression.
    ///
    /// # Examples
    ///
    /// ```
    /// use stowage_core::formats::compression::Compression;
    ///
    /// assert_eq!(Compression::None.extension(), "tar");
    /// assert_eq!(Compression::Gzip.extension(), "tar.gz");
    /// ```
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::None => "tar",
            Self::Gzip => "tar.gz",
        }
    }
}

/// Converts compression level (1-9) to flate2 compression level.
#[must_use]
pub fn compression_level_to_flate2(level: Option<u8>) -> flate2::Compression {
    match level {
        None | Some(6) => flate2::Compression::default(),
        Some(n) => flate2::Compression::new(u32::from(n.min(9))),
    }
}

/// Wraps `reader` in a decompressor matching `compression`.
///
/// Concatenated gzip members are read as one stream.
pub fn decoder<'a, R: Read + 'a>(reader: R, compression: Compression) -> Box<dyn Read + 'a> {
    match compression {
        Compression::None => Box::new(reader),
        Compression::Gzip => Box::new(MultiGzDecoder::new(reader)),
    }
}

/// A writer with an optional compression layer that must be finished.
pub enum Encoder<W: Write> {
    /// Pass-through.
    Plain(W),
    /// Gzip layer.
    Gzip(GzEncoder<W>),
}

impl<W: Write> Encoder<W> {
    /// Wraps `writer` according to `compression`.
    pub fn new(writer: W, compression: Compression, level: Option<u8>) -> Self {
        match compression {
            Compression::None => Self::Plain(writer),
            Compression::Gzip => {
                Self::Gzip(GzEncoder::new(writer, compression_level_to_flate2(level)))
            }
        }
    }

    /// Writes any trailer and returns the inner writer.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing the compressed stream fails.
    pub fn finish(self) -> std::io::Result<W> {
        match self {
            Self::Plain(mut w) => {
                w.flush()?;
                Ok(w)
            }
            Self::Gzip(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_from_flag() {
        assert_eq!(Compression::from_flag(true), Compression::Gzip);
        assert_eq!(Compression::from_flag(false), Compression::None);
        assert!(Compression::Gzip.is_compressed());
        assert!(!Compression::default().is_compressed());
    }

    #[test]
    fn test_gzip_encoder_roundtrip() {
        let mut encoder = Encoder::new(Vec::new(), Compression::Gzip, Some(9));
        encoder.write_all(b"hello hello hello").unwrap();
        let bytes = encoder.finish().unwrap();
        assert_eq!(&bytes[0..2], &[0x1f, 0x8b]);

        let mut decoded = String::new();
        decoder(Cursor::new(bytes), Compression::Gzip)
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "hello hello hello");
    }

    #[test]
    fn test_gzip_decoder_reads_all_members() {
        let mut bytes = Vec::new();
        for part in [&b"first "[..], b"second"] {
            let mut encoder = Encoder::new(Vec::new(), Compression::Gzip, None);
            encoder.write_all(part).unwrap();
            bytes.extend(encoder.finish().unwrap());
        }

        let mut decoded = String::new();
        decoder(Cursor::new(bytes), Compression::Gzip)
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "first second");
    }

    #[test]
    fn test_plain_encoder_passthrough() {
        let mut encoder = Encoder::new(Vec::new(), Compression::None, None);
        encoder.write_all(b"raw").unwrap();
        assert_eq!(encoder.finish().unwrap(), b"raw");
    }

    #[test]
    fn test_flate2_levels() {
        assert_eq!(compression_level_to_flate2(None).level(), 6);
        assert_eq!(compression_level_to_flate2(Some(1)).level(), 1);
        assert_eq!(compression_level_to_flate2(Some(9)).level(), 9);
    }
}
