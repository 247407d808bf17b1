//! Common types used across P-EAK

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Primary key of a row in `students`
pub type StudentId = i64;

/// Primary key of an academy (tenant) owning students and records
pub type AcademyId = i64;

/// Numeric `record_type_id` stored in `student_records`
pub type RecordTypeId = i32;

// ============================================================================
// Record Types
// ============================================================================

/// Physical-fitness tests tracked by the academy.
///
/// The discriminant is the `record_type_id` used in `student_records`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// Standing long jump, centimetres
    StandingJump = 1,
    /// Medicine-ball throw, metres
    MedicineBall = 2,
    /// 20 m shuttle run, seconds
    Shuttle20m = 3,
    /// Sit and reach, centimetres
    SitAndReach = 4,
    /// 10 m shuttle run, seconds
    Shuttle10m = 5,
    /// Sit-ups, count
    SitUp = 6,
    /// Back strength
    BackStrength = 7,
}

impl RecordType {
    /// All record types in id order
    pub const ALL: [RecordType; 7] = [
        RecordType::StandingJump,
        RecordType::MedicineBall,
        RecordType::Shuttle20m,
        RecordType::SitAndReach,
        RecordType::Shuttle10m,
        RecordType::SitUp,
        RecordType::BackStrength,
    ];

    /// Database identifier
    pub fn id(self) -> RecordTypeId {
        self as RecordTypeId
    }

    /// Column carrying this test in the CSV export
    pub fn column(self) -> &'static str {
        match self {
            RecordType::StandingJump => "jump_cm",
            RecordType::MedicineBall => "medball_m",
            RecordType::Shuttle20m => "run20m_sec",
            RecordType::SitAndReach => "sit_reach_cm",
            RecordType::Shuttle10m => "run10m_sec",
            RecordType::SitUp => "situp_count",
            RecordType::BackStrength => "back_strength",
        }
    }
}

// ============================================================================
// Student Records
// ============================================================================

/// A single measured test result, one row of `student_records`.
///
/// `academy_id` is only set when records are written into a tenant scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub academy_id: Option<AcademyId>,
    pub student_id: StudentId,
    pub record_type_id: RecordTypeId,
    pub value: f64,
    pub measured_at: NaiveDate,
}

impl StudentRecord {
    /// Uniqueness key of the row in `student_records`
    pub fn key(&self) -> RecordKey {
        RecordKey {
            academy_id: self.academy_id,
            student_id: self.student_id,
            record_type_id: self.record_type_id,
            measured_at: self.measured_at,
        }
    }

    /// Render as a standalone `INSERT` statement.
    ///
    /// All interpolated values are numbers or a formatted date, so no quoting
    /// of user input happens here.
    pub fn to_insert_sql(&self) -> String {
        format!(
            "INSERT INTO student_records (student_id, record_type_id, value, measured_at) \
             VALUES ({}, {}, {}, '{}');",
            self.student_id,
            self.record_type_id,
            format_value(self.value),
            self.measured_at.format("%Y-%m-%d")
        )
    }
}

/// Duplicate-key identity of a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub academy_id: Option<AcademyId>,
    pub student_id: StudentId,
    pub record_type_id: RecordTypeId,
    pub measured_at: NaiveDate,
}

/// Format a measurement so integral values keep a fractional digit (`150.0`).
pub fn format_value(value: f64) -> String {
    format!("{:?}", value)
}
