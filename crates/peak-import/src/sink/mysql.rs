//! Transactional replace of an academy's records in MySQL

use crate::error::{ImportError, Result};
use crate::sink::RecordSink;
use async_trait::async_trait;
use peak_common::{AcademyId, StudentRecord};
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::{debug, info};

/// Deletes every record of one academy, then upserts the new set.
///
/// All statements run in one transaction that is committed by
/// [`finish`](RecordSink::finish). Dropping the sink before that rolls
/// everything back, including the delete.
pub struct MySqlRecordSink {
    tx: Option<Transaction<'static, MySql>>,
    academy_id: AcademyId,
    deleted: u64,
    written: usize,
}

impl MySqlRecordSink {
    /// Open a transaction and clear the academy's existing records
    pub async fn begin_replace(pool: &MySqlPool, academy_id: AcademyId) -> Result<Self> {
        let mut tx = pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM student_records WHERE academy_id = ?")
            .bind(academy_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        info!(academy_id, deleted, "Cleared existing records (pending commit)");

        Ok(Self {
            tx: Some(tx),
            academy_id,
            deleted,
            written: 0,
        })
    }

    /// Records removed by the initial delete
    pub fn deleted(&self) -> u64 {
        self.deleted
    }
}

/// Number of records an academy currently holds
pub async fn count_records(pool: &MySqlPool, academy_id: AcademyId) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student_records WHERE academy_id = ?")
        .bind(academy_id)
        .fetch_one(pool)
        .await?;

    Ok(u64::try_from(count).unwrap_or_default())
}

#[async_trait]
impl RecordSink for MySqlRecordSink {
    async fn write(&mut self, record: &StudentRecord) -> Result<()> {
        let tx = self
            .tx
            .as_mut()
            .ok_or_else(|| ImportError::config("record sink already committed"))?;

        sqlx::query(
            r#"
            INSERT INTO student_records
                (academy_id, student_id, record_type_id, value, measured_at)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE value = VALUES(value)
            "#,
        )
        .bind(self.academy_id)
        .bind(record.student_id)
        .bind(record.record_type_id)
        .bind(record.value)
        .bind(record.measured_at)
        .execute(&mut **tx)
        .await?;

        self.written += 1;
        debug!(
            student_id = record.student_id,
            record_type_id = record.record_type_id,
            measured_at = %record.measured_at,
            "Upserted record"
        );
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| ImportError::config("record sink already committed"))?;

        tx.commit().await?;

        info!(
            academy_id = self.academy_id,
            deleted = self.deleted,
            written = self.written,
            "Committed record replacement"
        );
        Ok(())
    }
}
