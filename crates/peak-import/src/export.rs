//! Reading the test-record CSV export
//!
//! Columns are located once from the header row. Rows are then read one at
//! a time into a reused [`StringRecord`] and viewed through [`ExportRow`].

use crate::error::{ImportError, Result};
use crate::record_types::RecordTypeMap;
use csv::StringRecord;
use peak_common::types::RecordTypeId;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

pub const NAME_COLUMN: &str = "name";
pub const GENDER_COLUMN: &str = "gender";
pub const CREATED_AT_COLUMN: &str = "created_at";

/// A measurement column found in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementColumn {
    pub index: usize,
    pub column: String,
    pub record_type_id: RecordTypeId,
}

/// Positions of the columns the reconciler reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLayout {
    name: usize,
    gender: Option<usize>,
    created_at: Option<usize>,
    measurements: Vec<MeasurementColumn>,
    missing_measurements: Vec<String>,
}

impl ExportLayout {
    /// Locate columns in the header row.
    ///
    /// `name` is always required and `gender` is required when
    /// `require_gender` is set. Mapped measurement columns absent from the
    /// header are reported and simply never produce records.
    pub fn resolve(
        headers: &StringRecord,
        record_types: &RecordTypeMap,
        require_gender: bool,
    ) -> Result<Self> {
        let position = |column: &str| headers.iter().position(|h| h.trim() == column);

        let name = position(NAME_COLUMN).ok_or_else(|| ImportError::missing_column(NAME_COLUMN))?;

        let gender = position(GENDER_COLUMN);
        if require_gender && gender.is_none() {
            return Err(ImportError::missing_column(GENDER_COLUMN));
        }

        let created_at = position(CREATED_AT_COLUMN);
        if created_at.is_none() {
            warn!("Export has no {} column, every row lacks a measurement date", CREATED_AT_COLUMN);
        }

        let mut measurements = Vec::new();
        let mut missing_measurements = Vec::new();
        for mapped in record_types.iter() {
            match position(mapped.column.as_str()) {
                Some(index) => measurements.push(MeasurementColumn {
                    index,
                    column: mapped.column.clone(),
                    record_type_id: mapped.record_type_id,
                }),
                None => missing_measurements.push(mapped.column.clone()),
            }
        }

        if !missing_measurements.is_empty() {
            warn!(columns = ?missing_measurements, "Export is missing measurement columns");
        }

        Ok(Self {
            name,
            gender,
            created_at,
            measurements,
            missing_measurements,
        })
    }

    pub fn measurements(&self) -> &[MeasurementColumn] {
        &self.measurements
    }

    /// Mapped columns that the header does not contain
    pub fn missing_measurements(&self) -> &[String] {
        &self.missing_measurements
    }
}

/// Borrowed view of one export row
#[derive(Debug, Clone, Copy)]
pub struct ExportRow<'a> {
    layout: &'a ExportLayout,
    record: &'a StringRecord,
}

impl<'a> ExportRow<'a> {
    pub fn new(layout: &'a ExportLayout, record: &'a StringRecord) -> Self {
        Self { layout, record }
    }

    /// 1-based line number in the file, when known
    pub fn line(&self) -> Option<u64> {
        self.record.position().map(|p| p.line())
    }

    pub fn name(&self) -> &'a str {
        self.record.get(self.layout.name).unwrap_or_default()
    }

    pub fn gender(&self) -> Option<&'a str> {
        self.layout.gender.and_then(|i| self.record.get(i))
    }

    pub fn created_at(&self) -> Option<&'a str> {
        self.layout.created_at.and_then(|i| self.record.get(i))
    }

    /// Raw cell of every mapped measurement column, in record type order.
    ///
    /// Short rows yield an empty cell for columns past their end.
    pub fn measurements(&self) -> impl Iterator<Item = (&'a MeasurementColumn, &'a str)> + 'a {
        let layout = self.layout;
        let record = self.record;
        layout
            .measurements
            .iter()
            .map(move |m| (m, record.get(m.index).unwrap_or_default()))
    }
}

/// Streaming reader over an export
pub struct ExportReader<R> {
    reader: csv::Reader<R>,
    layout: ExportLayout,
}

impl ExportReader<File> {
    /// Open an export file
    pub fn open(
        path: impl AsRef<Path>,
        record_types: &RecordTypeMap,
        require_gender: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        debug!(path = %path.display(), "Opening export");
        Self::from_reader(File::open(path)?, record_types, require_gender)
    }
}

impl<R: Read> ExportReader<R> {
    /// Wrap any reader producing UTF-8 CSV with a header row
    pub fn from_reader(reader: R, record_types: &RecordTypeMap, require_gender: bool) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let layout = ExportLayout::resolve(&headers, record_types, require_gender)?;

        Ok(Self { reader, layout })
    }

    pub fn layout(&self) -> &ExportLayout {
        &self.layout
    }

    /// Read the next data row into `record`; `false` at end of input
    pub fn read_record(&mut self, record: &mut StringRecord) -> Result<bool> {
        Ok(self.reader.read_record(record)?)
    }
}
