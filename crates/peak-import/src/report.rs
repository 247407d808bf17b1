//! Run reports printed at the end of an import

use crate::error::Result;
use crate::students::{MatchBy, StudentKey};
use peak_common::AcademyId;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// A cell that could not be parsed as a number
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidValue {
    pub line: Option<u64>,
    pub student: String,
    pub column: String,
    pub raw: String,
}

/// Tallies of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub match_by: MatchBy,
    pub rows_read: usize,
    pub records_emitted: usize,
    pub excluded_rows: usize,
    pub unmatched_rows: usize,
    /// Rows dropped because `created_at` held no usable date
    pub undated_rows: usize,
    /// Rows whose date fell back to the run date
    pub defaulted_dates: usize,
    pub matched: BTreeSet<StudentKey>,
    pub unmatched: BTreeSet<StudentKey>,
    pub invalid_values: Vec<InvalidValue>,
}

impl ReconcileReport {
    pub fn new(match_by: MatchBy) -> Self {
        Self {
            match_by,
            rows_read: 0,
            records_emitted: 0,
            excluded_rows: 0,
            unmatched_rows: 0,
            undated_rows: 0,
            defaulted_dates: 0,
            matched: BTreeSet::new(),
            unmatched: BTreeSet::new(),
            invalid_values: Vec::new(),
        }
    }
}

/// Which subcommand produced a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Script,
    Restore,
}

/// Everything an operator needs to know after a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub input: PathBuf,
    pub input_sha256: String,
    pub student_source: String,
    pub students_indexed: usize,
    /// Directory rows whose key was already taken (the later id is kept)
    pub duplicate_students: usize,
    /// Mapped measurement columns absent from the export header
    pub missing_columns: Vec<String>,
    pub dry_run: bool,
    /// Script file written by `script`
    pub output: Option<PathBuf>,
    /// Academy whose records `restore` replaced
    pub academy_id: Option<AcademyId>,
    /// Existing records removed (or, on a dry run, that would be removed)
    pub deleted_records: Option<u64>,
    pub report: ReconcileReport,
}

impl RunSummary {
    /// Command that applies a generated script
    pub fn apply_hint(&self) -> Option<String> {
        self.output
            .as_ref()
            .map(|path| format!("mysql -u <user> -p <database> < {}", path.display()))
    }

    /// Write the summary as pretty JSON
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Report written");
        Ok(())
    }
}

fn write_keys(f: &mut fmt::Formatter<'_>, keys: &BTreeSet<StudentKey>) -> fmt::Result {
    if keys.is_empty() {
        return Ok(());
    }
    let list: Vec<String> = keys.iter().map(ToString::to_string).collect();
    writeln!(f, "  {}", list.join(", "))
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.report;
        let title = match (self.mode, self.dry_run) {
            (RunMode::Script, _) => "SQL script generated",
            (RunMode::Restore, false) => "Records restored",
            (RunMode::Restore, true) => "Restore dry run (nothing written)",
        };

        writeln!(f, "=== {} ===", title)?;
        writeln!(f, "Input:              {} (sha256 {})", self.input.display(), self.input_sha256)?;
        writeln!(f, "Students indexed:   {} from {}", self.students_indexed, self.student_source)?;
        if self.duplicate_students > 0 {
            writeln!(f, "Duplicate students: {} (later id kept)", self.duplicate_students)?;
        }
        if !self.missing_columns.is_empty() {
            writeln!(f, "Missing columns:    {}", self.missing_columns.join(", "))?;
        }
        if let Some(academy_id) = self.academy_id {
            writeln!(f, "Academy:            {}", academy_id)?;
        }
        if let Some(deleted) = self.deleted_records {
            let label = if self.dry_run { "Would delete:" } else { "Deleted:" };
            writeln!(f, "{:<20}{}", label, deleted)?;
        }
        writeln!(f, "Rows read:          {}", r.rows_read)?;
        writeln!(f, "Records emitted:    {}", r.records_emitted)?;

        writeln!(f)?;
        writeln!(f, "Matched students:   {}", r.matched.len())?;
        write_keys(f, &r.matched)?;
        writeln!(f, "Unmatched students: {} ({} rows)", r.unmatched.len(), r.unmatched_rows)?;
        write_keys(f, &r.unmatched)?;

        if r.excluded_rows > 0 {
            writeln!(f, "Excluded rows:      {}", r.excluded_rows)?;
        }
        if r.undated_rows > 0 {
            writeln!(f, "Rows without date:  {}", r.undated_rows)?;
        }
        if r.defaulted_dates > 0 {
            writeln!(f, "Dates set to today: {}", r.defaulted_dates)?;
        }
        if !r.invalid_values.is_empty() {
            writeln!(f, "Invalid values:     {}", r.invalid_values.len())?;
            for v in &r.invalid_values {
                let line = v.line.map(|l| l.to_string()).unwrap_or_else(|| "?".to_string());
                writeln!(f, "  line {}: {} {} = {:?}", line, v.student, v.column, v.raw)?;
            }
        }

        if let Some(hint) = self.apply_hint() {
            writeln!(f)?;
            writeln!(f, "Apply with:")?;
            writeln!(f, "  {}", hint)?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn summary(mode: RunMode) -> RunSummary {
        let mut report = ReconcileReport::new(MatchBy::Name);
        report.rows_read = 3;
        report.records_emitted = 4;
        report.matched.insert(MatchBy::Name.key("김철수", None));
        report.unmatched.insert(MatchBy::Name.key("박민수", None));
        report.unmatched_rows = 1;
        report.invalid_values.push(InvalidValue {
            line: Some(3),
            student: "김철수".to_string(),
            column: "medball_m".to_string(),
            raw: "abc".to_string(),
        });

        RunSummary {
            mode,
            input: PathBuf::from("test.csv"),
            input_sha256: "abc123".to_string(),
            student_source: "file students.tsv".to_string(),
            students_indexed: 10,
            duplicate_students: 0,
            missing_columns: Vec::new(),
            dry_run: false,
            output: (mode == RunMode::Script).then(|| PathBuf::from("import.sql")),
            academy_id: (mode == RunMode::Restore).then_some(2),
            deleted_records: (mode == RunMode::Restore).then_some(7),
            report,
        }
    }

    #[test]
    fn test_script_summary_text() {
        let text = summary(RunMode::Script).to_string();
        assert!(text.contains("SQL script generated"));
        assert!(text.contains("Records emitted:    4"));
        assert!(text.contains("Unmatched students: 1 (1 rows)"));
        assert!(text.contains("  박민수"));
        assert!(text.contains("line 3: 김철수 medball_m = \"abc\""));
        assert!(text.contains("mysql -u <user> -p <database> < import.sql"));
        assert!(!text.contains("Duplicate students"));
        assert!(!text.contains("Missing columns"));
    }

    #[test]
    fn test_summary_lists_directory_and_header_gaps() {
        let mut summary = summary(RunMode::Script);
        summary.duplicate_students = 2;
        summary.missing_columns = vec!["sit_reach_cm".to_string(), "back_strength".to_string()];

        let text = summary.to_string();
        assert!(text.contains("Duplicate students: 2 (later id kept)"));
        assert!(text.contains("Missing columns:    sit_reach_cm, back_strength"));
    }

    #[test]
    fn test_restore_summary_text() {
        let text = summary(RunMode::Restore).to_string();
        assert!(text.contains("Records restored"));
        assert!(text.contains("Academy:            2"));
        assert!(text.contains("Deleted:"));
        assert!(!text.contains("Apply with"));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        summary(RunMode::Restore).write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["mode"], "restore");
        assert_eq!(value["report"]["records_emitted"], 4);
        assert_eq!(value["report"]["unmatched"][0]["name"], "박민수");
    }
}
