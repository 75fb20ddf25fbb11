/// Errors that can occur while loading or merging record arrays
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Legacy CSV parse error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// The file is not a recognized record array
    #[error("Unrecognized record array {path}: {message}")]
    FormatError {
        /// Offending file
        path: String,
        /// What was wrong with it
        message: String,
    },

    /// Arrays cannot be joined
    #[error("Cannot merge record arrays: {0}")]
    MergeError(String),
}

impl RecordError {
    pub(crate) fn format(path: impl std::fmt::Display, message: impl Into<String>) -> Self {
        RecordError::FormatError {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
