/// Errors that can occur while reading or writing STAR tables
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed block, header or data line
    #[error("Parse error in {path} at line {line}: {message}")]
    ParseError {
        /// File (or stream name) being parsed
        path: String,
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Requested block does not exist in the file
    #[error("Block data_{block} not found in {path} (available: {available})")]
    BlockNotFoundError {
        /// Requested block name
        block: String,
        /// File that was searched
        path: String,
        /// Comma separated list of the blocks present
        available: String,
    },

    /// Rows cannot be written as one table
    #[error("Invalid table: {0}")]
    InvalidTable(String),
}
