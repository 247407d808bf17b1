//! SQL script output

use crate::error::Result;
use crate::sink::RecordSink;
use async_trait::async_trait;
use peak_common::StudentRecord;
use std::path::PathBuf;
use tracing::info;

/// Accumulates one `INSERT` per record and writes them on [`finish`](RecordSink::finish)
pub struct SqlScriptSink {
    path: PathBuf,
    statements: Vec<String>,
}

impl SqlScriptSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            statements: Vec::new(),
        }
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

#[async_trait]
impl RecordSink for SqlScriptSink {
    async fn write(&mut self, record: &StudentRecord) -> Result<()> {
        self.statements.push(record.to_insert_sql());
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut script = self.statements.join("\n");
        if !script.is_empty() {
            script.push('\n');
        }
        std::fs::write(&self.path, script)?;

        info!(
            path = %self.path.display(),
            statements = self.statements.len(),
            "SQL script written"
        );
        Ok(())
    }
}
