use std::path::PathBuf;

/// Errors that can occur while resolving or materializing image files
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// No search root holds the referenced file
    #[error("Cannot find {location} in any of: {}", format_roots(.roots))]
    NotFoundError {
        /// Locator that failed to resolve
        location: String,
        /// Roots that were searched
        roots: Vec<PathBuf>,
    },

    /// External stack conversion failed
    #[error("Converting {source_path} failed: {message}")]
    ConversionError {
        /// Stack that was being converted
        source_path: PathBuf,
        /// Converter output or exit status
        message: String,
    },
}

fn format_roots(roots: &[PathBuf]) -> String {
    roots
        .iter()
        .map(|r| r.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
