use std::fmt;

/// Statistics from a completed write operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Number of write calls
    pub batches_written: usize,
    /// Total number of rows written
    pub rows_written: usize,
    /// Number of marks (granules) in the part
    pub marks_written: usize,
    /// Number of files in the checksum manifest
    pub files_written: usize,
    /// Total size of the listed files in bytes
    pub bytes_on_disk: u64,
}

impl fmt::Display for WriterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wrote {} rows in {} batches ({} marks, {} files, {} bytes)",
            self.rows_written,
            self.batches_written,
            self.marks_written,
            self.files_written,
            self.bytes_on_disk
        )
    }
}
