/// Errors that can occur while parsing or validating part metadata
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Type name not recognized
    #[error("Unknown data type: {0}")]
    UnknownType(String),

    /// Type expression is recognized but malformed or not allowed
    #[error("Invalid data type: {0}")]
    InvalidType(String),

    /// Arrow type without a column type counterpart
    #[error("Unsupported Arrow type: {0}")]
    UnsupportedArrowType(String),

    /// In-memory array does not have the layout of the declared type
    #[error("Expected {expected} array, got {actual}")]
    ArrayTypeMismatch {
        /// Declared column type
        expected: String,
        /// Arrow type of the array
        actual: String,
    },

    /// Malformed `columns.txt`
    #[error("Cannot parse column list: {0}")]
    ColumnsFormat(String),

    /// Malformed `checksums.txt`
    #[error("Cannot parse checksums: {0}")]
    ChecksumsFormat(String),

    /// Two manifests or a manifest and the files on disk disagree
    #[error("Checksum mismatch for {file}: {reason}")]
    ChecksumMismatch {
        /// File the mismatch was found in
        file: String,
        /// What differs
        reason: String,
    },

    /// I/O error while reading or writing metadata files
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
