//! Pack and unpack operation reporting.

use std::time::Duration;

/// Report of a completed pack operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackReport {
    /// Number of file entries written to the archive.
    pub files_added: usize,

    /// Total payload bytes written (before compression).
    pub bytes_written: u64,

    /// Duration of the operation.
    pub duration: Duration,
}

impl PackReport {
    /// Creates a new empty pack report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Report of a completed unpack operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpackReport {
    /// Number of files written to disk.
    pub files_extracted: usize,

    /// Number of distinct parent directories ensured.
    pub directories_created: usize,

    /// Directory and other non-regular entries that were skipped.
    pub entries_skipped: usize,

    /// Total payload bytes written to disk.
    pub bytes_written: u64,

    /// Duration of the operation.
    pub duration: Duration,
}

impl UnpackReport {
    /// Creates a new empty unpack report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of archive entries seen.
    #[must_use]
    pub fn total_entries(&self) -> usize {
        self.files_extracted + self.entries_skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_entries() {
        let report = UnpackReport {
            files_extracted: 3,
            entries_skipped: 2,
            ..UnpackReport::new()
        };
        assert_eq!(report.total_entries(), 5);
    }
}
