//! Export row → student record reconciliation
//!
//! For every row, in file order:
//!
//! 1. rows whose name is excluded are skipped silently
//! 2. the name (and gender, when matching by it) is resolved to a student id;
//!    misses are tallied as unmatched
//! 3. the measurement date is the leading `YYYY-MM-DD` of `created_at`; rows
//!    without one are skipped or dated today depending on [`MissingDatePolicy`]
//! 4. each mapped measurement cell becomes one [`StudentRecord`], unless it is
//!    empty, `NULL`, `F`, or not a number
//!
//! Only I/O and sink failures abort a run.

use crate::error::Result;
use crate::export::{ExportReader, ExportRow};
use crate::report::{InvalidValue, ReconcileReport};
use crate::students::{GenderMap, StudentIndex};
use crate::sink::RecordSink;
use chrono::NaiveDate;
use csv::StringRecord;
use indicatif::ProgressBar;
use peak_common::{AcademyId, StudentRecord};
use std::collections::BTreeSet;
use std::io::Read;
use tracing::{debug, info, warn};

/// Cell spellings meaning "test not taken"
pub const NOT_MEASURED: [&str; 2] = ["NULL", "F"];

/// What to do with a row whose `created_at` carries no date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingDatePolicy {
    /// Drop the whole row
    SkipRow,
    /// Attribute the row to the run date
    Today,
}

/// Interpretation of one measurement cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue {
    NotMeasured,
    Value(f64),
    Invalid,
}

/// Classify a raw measurement cell
pub fn classify_value(raw: &str) -> CellValue {
    let raw = raw.trim();
    if raw.is_empty() || NOT_MEASURED.contains(&raw) {
        return CellValue::NotMeasured;
    }

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => CellValue::Value(value),
        _ => CellValue::Invalid,
    }
}

/// Date prefix of a `created_at` timestamp such as `2025-05-04 23:47:00`
pub fn measured_at(created_at: Option<&str>) -> Option<NaiveDate> {
    let prefix = created_at?.trim().get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Per-run reconciliation settings
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub exclusions: BTreeSet<String>,
    pub gender_map: GenderMap,
    pub date_policy: MissingDatePolicy,
    /// Stamped on every emitted record
    pub academy_id: Option<AcademyId>,
}

pub struct Reconciler {
    index: StudentIndex,
    options: ReconcileOptions,
    today: NaiveDate,
    progress: Option<ProgressBar>,
}

impl Reconciler {
    pub fn new(index: StudentIndex, options: ReconcileOptions) -> Self {
        Self {
            index,
            options,
            today: chrono::Local::now().date_naive(),
            progress: None,
        }
    }

    /// Override the date used by [`MissingDatePolicy::Today`]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Tick `progress` once per row
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn index(&self) -> &StudentIndex {
        &self.index
    }

    /// Stream every row of `export` into `sink`.
    ///
    /// `sink` is not finished here; the caller decides when to commit.
    pub async fn run<R, S>(&self, export: &mut ExportReader<R>, sink: &mut S) -> Result<ReconcileReport>
    where
        R: Read,
        S: RecordSink + ?Sized,
    {
        let mut report = ReconcileReport::new(self.index.match_by());
        let mut record = StringRecord::new();

        while export.read_record(&mut record)? {
            let row = ExportRow::new(export.layout(), &record);
            let records = self.reconcile_row(&row, &mut report);

            for r in &records {
                sink.write(r).await?;
            }
            report.records_emitted += records.len();

            if let Some(progress) = &self.progress {
                progress.inc(1);
            }
        }

        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        info!(
            rows = report.rows_read,
            records = report.records_emitted,
            matched = report.matched.len(),
            unmatched = report.unmatched.len(),
            invalid_values = report.invalid_values.len(),
            "Export reconciled"
        );

        Ok(report)
    }

    /// Records produced by a single row, updating `report` tallies
    pub fn reconcile_row(&self, row: &ExportRow<'_>, report: &mut ReconcileReport) -> Vec<StudentRecord> {
        report.rows_read += 1;

        let name = row.name();
        if self.options.exclusions.contains(name) {
            report.excluded_rows += 1;
            debug!(student = %name, line = ?row.line(), "Excluded name, skipping row");
            return Vec::new();
        }

        let gender = row.gender().map(|g| self.options.gender_map.translate(g));
        let key = self.index.match_by().key(name, gender);

        let Some(student_id) = self.index.resolve(&key) else {
            debug!(student = %key, line = ?row.line(), "No matching student");
            report.unmatched_rows += 1;
            report.unmatched.insert(key);
            return Vec::new();
        };

        let measured_at = match (measured_at(row.created_at()), self.options.date_policy) {
            (Some(date), _) => date,
            (None, MissingDatePolicy::SkipRow) => {
                debug!(student = %key, created_at = ?row.created_at(), "No measurement date, skipping row");
                report.undated_rows += 1;
                return Vec::new();
            },
            (None, MissingDatePolicy::Today) => {
                debug!(student = %key, created_at = ?row.created_at(), today = %self.today, "No measurement date, using today");
                report.defaulted_dates += 1;
                self.today
            },
        };

        let mut records = Vec::new();
        for (column, raw) in row.measurements() {
            match classify_value(raw) {
                CellValue::NotMeasured => {},
                CellValue::Value(value) => records.push(StudentRecord {
                    academy_id: self.options.academy_id,
                    student_id,
                    record_type_id: column.record_type_id,
                    value,
                    measured_at,
                }),
                CellValue::Invalid => {
                    warn!(
                        student = %name,
                        column = %column.column,
                        value = %raw,
                        line = ?row.line(),
                        "Invalid record value, skipping column"
                    );
                    report.invalid_values.push(InvalidValue {
                        line: row.line(),
                        student: name.to_string(),
                        column: column.column.clone(),
                        raw: raw.to_string(),
                    });
                },
            }
        }

        report.matched.insert(key);
        records
    }
}
