//! Export column to `record_type_id` mapping

use crate::error::{ImportError, Result};
use peak_common::types::RecordTypeId;
use peak_common::RecordType;
use std::collections::{BTreeMap, HashSet};

/// One measurement column of the export and the record type it feeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordColumn {
    pub column: String,
    pub record_type_id: RecordTypeId,
}

/// Ordered column → record type mapping, iterated in ascending id order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTypeMap {
    columns: Vec<RecordColumn>,
}

impl Default for RecordTypeMap {
    fn default() -> Self {
        Self {
            columns: RecordType::ALL
                .iter()
                .map(|t| RecordColumn {
                    column: t.column().to_string(),
                    record_type_id: t.id(),
                })
                .collect(),
        }
    }
}

impl RecordTypeMap {
    /// Start from the default mapping and apply per-column id overrides.
    ///
    /// Unknown columns are added as extra measurements. Ids must be positive
    /// and unique across the resulting map.
    pub fn with_overrides(overrides: &BTreeMap<String, RecordTypeId>) -> Result<Self> {
        let mut map = Self::default();

        for (column, &id) in overrides {
            let column = column.trim();
            if column.is_empty() {
                return Err(ImportError::config("record type column name cannot be empty"));
            }
            if id <= 0 {
                return Err(ImportError::config(format!(
                    "record type id for '{}' must be positive, got {}",
                    column, id
                )));
            }

            match map.columns.iter_mut().find(|c| c.column == column) {
                Some(existing) => existing.record_type_id = id,
                None => map.columns.push(RecordColumn {
                    column: column.to_string(),
                    record_type_id: id,
                }),
            }
        }

        let mut seen = HashSet::new();
        for c in &map.columns {
            if !seen.insert(c.record_type_id) {
                return Err(ImportError::config(format!(
                    "record type id {} is assigned to more than one column",
                    c.record_type_id
                )));
            }
        }

        map.columns.sort_by_key(|c| c.record_type_id);
        Ok(map)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordColumn> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Record type id for a column, if mapped
    pub fn id_for(&self, column: &str) -> Option<RecordTypeId> {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.record_type_id)
    }
}
