/// Errors that can occur during writing
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from the Arrow library during array operations
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Column type, serialization or metadata format error
    #[error("Schema error: {0}")]
    SchemaError(#[from] crate::schema::SchemaError),

    /// Operation this writer variant does not implement
    #[error("Not implemented: {0}")]
    Unsupported(String),

    /// Sort key names the same column twice
    #[error("Primary key contains duplicate column: {0}")]
    DuplicatePrimaryKeyColumn(String),

    /// Column missing from the batch
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Batch column does not match the declared type
    #[error("Type mismatch for column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Column name
        column: String,
        /// Declared type
        expected: String,
        /// Arrow type of the batch column
        found: String,
    },

    /// Permutation length or values do not fit the batch
    #[error("Invalid permutation: {0}")]
    InvalidPermutation(String),

    /// Writer settings cannot be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Column refers to a stream that was never created
    #[error("No stream for {0}")]
    StreamNotFound(String),
}

impl From<crate::schema::SchemaValidationError> for WriterError {
    fn from(err: crate::schema::SchemaValidationError) -> Self {
        use crate::schema::SchemaValidationError;
        match err {
            SchemaValidationError::MissingColumn(name) => WriterError::ColumnNotFound(name),
            SchemaValidationError::TypeMismatch {
                column,
                expected,
                found,
            } => WriterError::TypeMismatch {
                column,
                expected,
                found,
            },
        }
    }
}
