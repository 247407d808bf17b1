//! Student directory and the lookup index built from it
//!
//! Rows of the export carry names, not ids. The index maps a natural key,
//! either the name alone or the name with a gender code, to `students.id`.

use crate::error::{ImportError, Result};
use async_trait::async_trait;
use peak_common::{AcademyId, StudentId};
use serde::Serialize;
use sqlx::MySqlPool;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// One row of the student registry
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StudentRow {
    pub id: StudentId,
    pub name: String,
    pub gender: Option<String>,
}

// ============================================================================
// Keys
// ============================================================================

/// Which fields identify a student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBy {
    Name,
    NameAndGender,
}

impl MatchBy {
    /// Build the lookup key for a name and an already-translated gender code
    pub fn key(self, name: &str, gender: Option<&str>) -> StudentKey {
        let gender = match self {
            MatchBy::Name => None,
            MatchBy::NameAndGender => gender
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string),
        };

        StudentKey {
            name: name.trim().to_string(),
            gender,
        }
    }
}

/// Natural key of a student
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StudentKey {
    pub name: String,
    pub gender: Option<String>,
}

impl std::fmt::Display for StudentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.gender {
            Some(gender) => write!(f, "{} ({})", self.name, gender),
            None => f.write_str(&self.name),
        }
    }
}

/// Translates export gender spellings into `students.gender` codes.
///
/// Values without a mapping pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenderMap {
    codes: BTreeMap<String, String>,
}

impl GenderMap {
    pub fn new(codes: BTreeMap<String, String>) -> Self {
        Self { codes }
    }

    pub fn translate<'a>(&'a self, raw: &'a str) -> &'a str {
        let raw = raw.trim();
        self.codes.get(raw).map(String::as_str).unwrap_or(raw)
    }
}

// ============================================================================
// Index
// ============================================================================

/// Read-only key → student id lookup for one run
#[derive(Debug, Clone)]
pub struct StudentIndex {
    match_by: MatchBy,
    ids: HashMap<StudentKey, StudentId>,
    duplicate_keys: usize,
}

impl StudentIndex {
    /// Build the index. When two rows share a key the later row wins.
    pub fn build(rows: impl IntoIterator<Item = StudentRow>, match_by: MatchBy) -> Self {
        let mut ids = HashMap::new();
        let mut duplicate_keys = 0;

        for row in rows {
            let key = match_by.key(&row.name, row.gender.as_deref());
            if let Some(previous) = ids.insert(key.clone(), row.id) {
                duplicate_keys += 1;
                warn!(
                    student = %key,
                    previous_id = previous,
                    id = row.id,
                    "Duplicate student key in directory, keeping the later id"
                );
            }
        }

        info!(students = ids.len(), duplicate_keys, "Student index built");

        Self {
            match_by,
            ids,
            duplicate_keys,
        }
    }

    pub fn match_by(&self) -> MatchBy {
        self.match_by
    }

    pub fn resolve(&self, key: &StudentKey) -> Option<StudentId> {
        self.ids.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of directory rows whose key was already taken
    pub fn duplicate_keys(&self) -> usize {
        self.duplicate_keys
    }
}

// ============================================================================
// Directories
// ============================================================================

/// Trusted source of student identities
#[async_trait]
pub trait StudentDirectory: Send + Sync {
    /// Load students, restricted to one academy when `academy_id` is set
    async fn load(&self, academy_id: Option<AcademyId>) -> Result<Vec<StudentRow>>;

    /// Human-readable description for logs and reports
    fn describe(&self) -> String;
}

/// `students` table in the P-EAK MySQL database
pub struct MySqlStudentDirectory {
    pool: MySqlPool,
}

impl MySqlStudentDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StudentDirectory for MySqlStudentDirectory {
    async fn load(&self, academy_id: Option<AcademyId>) -> Result<Vec<StudentRow>> {
        let rows = match academy_id {
            Some(academy_id) => {
                sqlx::query_as::<_, StudentRow>(
                    r#"
                    SELECT CAST(id AS SIGNED) AS id, name, CAST(gender AS CHAR) AS gender
                    FROM students
                    WHERE academy_id = ?
                    "#,
                )
                .bind(academy_id)
                .fetch_all(&self.pool)
                .await?
            },
            None => {
                sqlx::query_as::<_, StudentRow>(
                    r#"
                    SELECT CAST(id AS SIGNED) AS id, name, CAST(gender AS CHAR) AS gender
                    FROM students
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            },
        };

        debug!(rows = rows.len(), academy_id = ?academy_id, "Loaded students from database");
        Ok(rows)
    }

    fn describe(&self) -> String {
        "database table students".to_string()
    }
}

/// Tab-separated `id<TAB>name[<TAB>gender]` file without a header.
///
/// This is what `mysql -N -e 'SELECT id, name, gender FROM students'`
/// prints, so a registry snapshot can be taken once and reused offline.
/// The file is assumed to be scoped already; `academy_id` is not applied.
pub struct FileStudentDirectory {
    path: PathBuf,
}

impl FileStudentDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_rows(&self) -> Result<Vec<StudentRow>> {
        if !self.path.exists() {
            return Err(ImportError::FileNotFound(self.path.display().to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(i + 1);

            let id = record.get(0).unwrap_or_default();
            let id = id.parse::<StudentId>().map_err(|_| ImportError::InvalidDirectory {
                line,
                reason: format!("student id {:?} is not an integer", id),
            })?;

            let name = record.get(1).unwrap_or_default();
            if name.is_empty() {
                return Err(ImportError::InvalidDirectory {
                    line,
                    reason: "missing student name".to_string(),
                });
            }

            let gender = record
                .get(2)
                .filter(|g| !g.is_empty() && *g != "NULL")
                .map(str::to_string);

            rows.push(StudentRow {
                id,
                name: name.to_string(),
                gender,
            });
        }

        Ok(rows)
    }
}

#[async_trait]
impl StudentDirectory for FileStudentDirectory {
    async fn load(&self, academy_id: Option<AcademyId>) -> Result<Vec<StudentRow>> {
        if let Some(academy_id) = academy_id {
            debug!(
                academy_id,
                path = %self.path.display(),
                "Student file is taken as already scoped to the academy"
            );
        }

        let rows = self.read_rows()?;
        debug!(rows = rows.len(), path = %self.path.display(), "Loaded students from file");
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn row(id: StudentId, name: &str, gender: Option<&str>) -> StudentRow {
        StudentRow {
            id,
            name: name.to_string(),
            gender: gender.map(str::to_string),
        }
    }

    #[test]
    fn test_key_by_name_drops_gender() {
        let key = MatchBy::Name.key(" 김철수 ", Some("M"));
        assert_eq!(key.name, "김철수");
        assert_eq!(key.gender, None);
        assert_eq!(key.to_string(), "김철수");
    }

    #[test]
    fn test_key_by_name_and_gender() {
        let key = MatchBy::NameAndGender.key("김철수", Some("M"));
        assert_eq!(key.to_string(), "김철수 (M)");
        assert_eq!(MatchBy::NameAndGender.key("김철수", Some(" ")).gender, None);
    }

    #[test]
    fn test_gender_map_translates_and_passes_through() {
        let map = GenderMap::new(BTreeMap::from([("여".to_string(), "F".to_string())]));
        assert_eq!(map.translate("여"), "F");
        assert_eq!(map.translate(" 여 "), "F");
        assert_eq!(map.translate("M"), "M");
        assert_eq!(map.translate(""), "");
    }

    #[test]
    fn test_index_resolves_by_name() {
        let index = StudentIndex::build(
            vec![row(1, "김철수", Some("M")), row(2, "이영희", Some("F"))],
            MatchBy::Name,
        );
        assert_eq!(index.len(), 2);
        assert_eq!(index.resolve(&MatchBy::Name.key("이영희", None)), Some(2));
        assert_eq!(index.resolve(&MatchBy::Name.key("박민수", None)), None);
    }

    #[test]
    fn test_index_distinguishes_gender() {
        let index = StudentIndex::build(
            vec![row(1, "김지민", Some("M")), row(2, "김지민", Some("F"))],
            MatchBy::NameAndGender,
        );
        assert_eq!(index.len(), 2);
        assert_eq!(index.duplicate_keys(), 0);
        assert_eq!(index.resolve(&MatchBy::NameAndGender.key("김지민", Some("F"))), Some(2));
        assert_eq!(index.resolve(&MatchBy::NameAndGender.key("김지민", None)), None);
    }

    #[test]
    fn test_index_duplicate_keeps_later_row() {
        let index = StudentIndex::build(
            vec![row(1, "김지민", Some("M")), row(2, "김지민", Some("F"))],
            MatchBy::Name,
        );
        assert_eq!(index.len(), 1);
        assert_eq!(index.duplicate_keys(), 1);
        assert_eq!(index.resolve(&MatchBy::Name.key("김지민", None)), Some(2));
    }

    #[tokio::test]
    async fn test_file_directory_reads_mysql_batch_output() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1\t김철수\tM\n2\t이영희\tNULL\n\n3\t박민수\n").unwrap();
        file.flush().unwrap();

        let rows = FileStudentDirectory::new(file.path()).load(None).await.unwrap();
        assert_eq!(
            rows,
            vec![
                row(1, "김철수", Some("M")),
                row(2, "이영희", None),
                row(3, "박민수", None),
            ]
        );
    }

    #[tokio::test]
    async fn test_file_directory_rejects_bad_id() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "abc\t김철수").unwrap();
        file.flush().unwrap();

        let err = FileStudentDirectory::new(file.path()).load(None).await.unwrap_err();
        assert!(matches!(err, ImportError::InvalidDirectory { line: 1, .. }));
    }

    #[tokio::test]
    async fn test_file_directory_missing_file() {
        let err = FileStudentDirectory::new("/nonexistent/students.tsv")
            .load(None)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }
}
