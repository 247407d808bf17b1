//! Destinations for reconciled records
//!
//! - [`SqlScriptSink`]: collects `INSERT` statements into a file for manual execution
//! - [`MySqlRecordSink`]: replaces an academy's records inside one transaction
//! - [`MemoryRecordSink`]: same replace/upsert semantics over an in-memory store

pub mod memory;
pub mod mysql;
pub mod script;

use crate::error::Result;
use async_trait::async_trait;
use peak_common::StudentRecord;

pub use memory::{MemoryRecordSink, MemoryStore};
pub use mysql::MySqlRecordSink;
pub use script::SqlScriptSink;

/// Receives records in emission order
#[async_trait]
pub trait RecordSink: Send {
    /// Persist or stage one record
    async fn write(&mut self, record: &StudentRecord) -> Result<()>;

    /// Make everything written so far durable. Called once, after the last write.
    async fn finish(&mut self) -> Result<()>;
}
