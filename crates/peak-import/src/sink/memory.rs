//! In-memory record store used for dry runs

use crate::error::Result;
use crate::sink::RecordSink;
use async_trait::async_trait;
use peak_common::types::RecordKey;
use peak_common::{AcademyId, StudentRecord};
use std::collections::BTreeMap;

/// `student_records` held in memory, keyed like the real unique key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    records: BTreeMap<RecordKey, f64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &BTreeMap<RecordKey, f64> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records in an academy scope
    pub fn count_scope(&self, academy_id: AcademyId) -> usize {
        self.records
            .keys()
            .filter(|k| k.academy_id == Some(academy_id))
            .count()
    }

    fn upsert(&mut self, record: &StudentRecord) {
        self.records.insert(record.key(), record.value);
    }

    fn delete_scope(&mut self, academy_id: AcademyId) -> usize {
        let before = self.records.len();
        self.records.retain(|k, _| k.academy_id != Some(academy_id));
        before - self.records.len()
    }
}

/// Stages records and applies them to a [`MemoryStore`] on finish.
///
/// Mirrors [`MySqlRecordSink`](super::MySqlRecordSink): nothing is visible
/// in the store until `finish`, and a replacing sink clears its academy first.
pub struct MemoryRecordSink<'a> {
    store: &'a mut MemoryStore,
    replace_scope: Option<AcademyId>,
    staged: Vec<StudentRecord>,
    deleted: usize,
}

impl<'a> MemoryRecordSink<'a> {
    /// Upsert into the store without deleting anything
    pub fn appending(store: &'a mut MemoryStore) -> Self {
        Self {
            store,
            replace_scope: None,
            staged: Vec::new(),
            deleted: 0,
        }
    }

    /// Replace every record of `academy_id` with the staged set
    pub fn replacing(store: &'a mut MemoryStore, academy_id: AcademyId) -> Self {
        Self {
            store,
            replace_scope: Some(academy_id),
            staged: Vec::new(),
            deleted: 0,
        }
    }

    pub fn staged(&self) -> &[StudentRecord] {
        &self.staged
    }

    /// Records removed from the store by `finish`
    pub fn deleted(&self) -> usize {
        self.deleted
    }
}

#[async_trait]
impl<'a> RecordSink for MemoryRecordSink<'a> {
    async fn write(&mut self, record: &StudentRecord) -> Result<()> {
        self.staged.push(record.clone());
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        if let Some(academy_id) = self.replace_scope {
            self.deleted = self.store.delete_scope(academy_id);
        }
        for record in self.staged.drain(..) {
            self.store.upsert(&record);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(academy_id: Option<AcademyId>, student_id: i64, value: f64) -> StudentRecord {
        StudentRecord {
            academy_id,
            student_id,
            record_type_id: 1,
            value,
            measured_at: NaiveDate::from_ymd_opt(2025, 5, 4).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_nothing_visible_before_finish() {
        let mut store = MemoryStore::new();
        let mut sink = MemoryRecordSink::appending(&mut store);
        sink.write(&record(None, 1, 150.0)).await.unwrap();
        assert_eq!(sink.staged().len(), 1);
        drop(sink);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_key_overwrites_value() {
        let mut store = MemoryStore::new();
        let mut sink = MemoryRecordSink::appending(&mut store);
        sink.write(&record(Some(2), 1, 150.0)).await.unwrap();
        sink.write(&record(Some(2), 1, 155.0)).await.unwrap();
        sink.finish().await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.records().values().next(), Some(&155.0));
    }

    #[tokio::test]
    async fn test_replace_only_touches_its_academy() {
        let mut store = MemoryStore::new();
        {
            let mut sink = MemoryRecordSink::appending(&mut store);
            sink.write(&record(Some(1), 10, 1.0)).await.unwrap();
            sink.write(&record(Some(2), 20, 2.0)).await.unwrap();
            sink.write(&record(Some(2), 21, 3.0)).await.unwrap();
            sink.finish().await.unwrap();
        }

        let mut sink = MemoryRecordSink::replacing(&mut store, 2);
        sink.write(&record(Some(2), 22, 4.0)).await.unwrap();
        sink.finish().await.unwrap();
        assert_eq!(sink.deleted(), 2);
        drop(sink);

        assert_eq!(store.count_scope(1), 1);
        assert_eq!(store.count_scope(2), 1);
    }
}
