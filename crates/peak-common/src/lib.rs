//! P-EAK Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the P-EAK record tools.
//!
//! # Overview
//!
//! - **Error Handling**: [`PeakError`] and the [`Result`] alias
//! - **Types**: record types, student records, academy scope
//! - **Logging**: `tracing` subscriber setup shared by every binary
//! - **Checksums**: fingerprinting of input exports
//!
//! # Example
//!
//! ```no_run
//! use peak_common::checksum::sha256_file;
//! use peak_common::Result;
//!
//! fn fingerprint(path: &str) -> Result<()> {
//!     let digest = sha256_file(path)?;
//!     println!("export sha256: {}", digest);
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{PeakError, Result};
pub use types::{AcademyId, RecordType, StudentId, StudentRecord};
