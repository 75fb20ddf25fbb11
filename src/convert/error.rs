use crate::location::LocationError;
use crate::mapper::MappingError;
use crate::records::RecordError;
use crate::table::TableError;

/// Errors that can occur during conversion
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Reading the engine arrays failed
    #[error("Record error: {0}")]
    RecordError(#[from] RecordError),

    /// Reading or writing a STAR table failed
    #[error("Table error: {0}")]
    TableError(#[from] TableError),

    /// A row could not be mapped
    #[error("Mapping error: {0}")]
    MappingError(#[from] MappingError),

    /// A referenced file could not be found or prepared
    #[error("Location error: {0}")]
    LocationError(#[from] LocationError),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// `--transform` is not valid JSON
    #[error("Invalid transform JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// `--transform` has the wrong shape
    #[error("Invalid transform: {0}")]
    TransformError(String),

    /// Refinement box size is zero, negative or not a number
    #[error("Invalid box size {0}: expected a positive number of pixels")]
    InvalidBoxSize(f64),

    /// Coordinate source pattern is malformed
    #[error("Invalid coordinate pattern: {0}")]
    PatternError(#[from] glob::PatternError),

    /// Coordinate source pattern matched nothing usable
    #[error("No STAR files match {0}")]
    NoCoordinateSource(String),

    /// Nothing to convert
    #[error("No input files given")]
    NoInput,
}
