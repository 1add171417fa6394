use thiserror::Error;

/// Raised when a source cannot be turned into an [`OrderTable`](super::model::OrderTable).
///
/// Loading is all-or-nothing: any of these aborts the load and no partial
/// table is returned.
#[derive(Debug, Error)]
pub enum DataFormatError {
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    /// A record-oriented source (JSON) left a required key out of one record.
    #[error("row {row}: missing required field '{column}'")]
    MissingField { row: usize, column: &'static str },

    /// `row` is the 1-based data row (header excluded).
    #[error("row {row}, column '{column}': cannot parse '{value}' as {expected}")]
    InvalidField {
        row: usize,
        column: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("malformed source: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}
