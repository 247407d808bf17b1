//! Error types for peak-import
//!
//! Only fatal conditions live here. Unmatched students, bad cell values and
//! malformed timestamps are tallied in the report instead of raised.

use thiserror::Error;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Fatal errors that abort an import run
#[derive(Error, Debug)]
pub enum ImportError {
    /// Input file is missing
    #[error("File not found: '{0}'. Verify the path exists and you have read permissions.")]
    FileNotFound(String),

    /// Export header lacks a column the matching mode needs
    #[error("CSV export is missing required column '{0}'. Check the header row of the export.")]
    MissingColumn(String),

    /// CSV structure could not be read
    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Student directory file has an unusable line
    #[error("Invalid student directory line {line}: {reason}")]
    InvalidDirectory { line: usize, reason: String },

    /// Database operation failed
    #[error("Database error: {0}. Check DATABASE_URL and that the server is reachable.")]
    Database(#[from] sqlx::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your flags, environment variables, or profile file.")]
    Config(String),

    /// Profile TOML could not be parsed
    #[error("Failed to parse profile: {0}")]
    Profile(#[from] toml::de::Error),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// JSON report could not be serialized
    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from shared code
    #[error(transparent)]
    Common(#[from] peak_common::PeakError),
}

impl ImportError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a missing column error
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn(column.into())
    }
}
