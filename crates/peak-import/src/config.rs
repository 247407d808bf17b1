//! Import profile configuration
//!
//! A profile is a small TOML file describing one data set: names to leave
//! out because they are ambiguous, how the export spells genders, and any
//! record type id overrides.
//!
//! ```toml
//! exclude_names = ["박시현"]
//!
//! [gender_map]
//! "여" = "F"
//! "남" = "M"
//!
//! [record_types]
//! jump_cm = 1
//! ```

use crate::error::{ImportError, Result};
use crate::record_types::RecordTypeMap;
use crate::students::GenderMap;
use peak_common::types::RecordTypeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

/// Per-data-set import settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportProfile {
    /// Names skipped before matching (known duplicates)
    pub exclude_names: BTreeSet<String>,

    /// Export gender spelling → `students.gender` code
    pub gender_map: BTreeMap<String, String>,

    /// Column → record type id overrides on top of the default mapping
    pub record_types: BTreeMap<String, RecordTypeId>,
}

impl Default for ImportProfile {
    fn default() -> Self {
        Self {
            exclude_names: BTreeSet::new(),
            gender_map: BTreeMap::from([
                ("여".to_string(), "F".to_string()),
                ("남".to_string(), "M".to_string()),
            ]),
            record_types: BTreeMap::new(),
        }
    }
}

impl ImportProfile {
    /// Load a profile from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let profile = Self::parse(&content)?;

        debug!(
            path = %path.display(),
            excluded = profile.exclude_names.len(),
            overrides = profile.record_types.len(),
            "Loaded import profile"
        );

        Ok(profile)
    }

    /// Parse a profile from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Add names from the command line to the exclusion set
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_names.extend(
            names
                .into_iter()
                .map(Into::into)
                .map(|n: String| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        );
        self
    }

    /// Resolve the record type mapping for this profile
    pub fn record_type_map(&self) -> Result<RecordTypeMap> {
        RecordTypeMap::with_overrides(&self.record_types)
    }

    pub fn gender_map(&self) -> GenderMap {
        GenderMap::new(self.gender_map.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_profile() {
        let profile = ImportProfile::default();
        assert!(profile.exclude_names.is_empty());
        assert_eq!(profile.gender_map.get("여").map(String::as_str), Some("F"));
        assert_eq!(profile.gender_map.get("남").map(String::as_str), Some("M"));
        assert_eq!(profile.record_type_map().unwrap(), RecordTypeMap::default());
    }

    #[test]
    fn test_parse_partial_profile_keeps_defaults() {
        let profile = ImportProfile::parse(r#"exclude_names = ["박시현"]"#).unwrap();
        assert!(profile.exclude_names.contains("박시현"));
        assert_eq!(profile.gender_map.len(), 2);
    }

    #[test]
    fn test_parse_full_profile() {
        let profile = ImportProfile::parse(
            r#"
            exclude_names = ["A", "B"]

            [gender_map]
            "female" = "F"

            [record_types]
            back_strength = 9
            "#,
        )
        .unwrap();

        assert_eq!(profile.exclude_names.len(), 2);
        assert_eq!(profile.gender_map.len(), 1);
        assert_eq!(profile.record_type_map().unwrap().id_for("back_strength"), Some(9));
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(ImportProfile::parse("exclude = [\"A\"]").is_err());
    }

    #[test]
    fn test_exclude_merges_and_trims() {
        let profile = ImportProfile::default().exclude(vec![" 김철수 ", "", "이영희"]);
        assert_eq!(profile.exclude_names.len(), 2);
        assert!(profile.exclude_names.contains("김철수"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "exclude_names = [\"박시현\"]").unwrap();
        file.flush().unwrap();

        let profile = ImportProfile::load(file.path()).unwrap();
        assert!(profile.exclude_names.contains("박시현"));
    }

    #[test]
    fn test_example_profile_parses() {
        let profile =
            ImportProfile::parse(include_str!("../../../config/peak-import.example.toml")).unwrap();
        assert!(profile.exclude_names.contains("박시현"));
        assert_eq!(profile.gender_map(), ImportProfile::default().gender_map());
        assert_eq!(profile.record_type_map().unwrap(), RecordTypeMap::default());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ImportProfile::load("/nonexistent/profile.toml").unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }
}
