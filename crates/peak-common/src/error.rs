//! Error types shared by the P-EAK crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, PeakError>;

/// Main error type for shared P-EAK code
#[derive(Error, Debug)]
pub enum PeakError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
