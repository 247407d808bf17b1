//! Subcommand implementations

pub mod restore;
pub mod script;

use crate::config::ImportProfile;
use crate::db::{create_pool, DbConfig};
use crate::error::{ImportError, Result};
use crate::report::RunSummary;
use crate::students::{FileStudentDirectory, MySqlStudentDirectory, StudentDirectory};
use clap::Args;
use peak_common::checksum::sha256_file;
use sqlx::MySqlPool;
use std::path::{Path, PathBuf};
use tracing::info;

/// Flags shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Test-record CSV export
    #[arg(long, value_name = "PATH")]
    pub csv: PathBuf,

    /// Tab-separated student snapshot (id, name[, gender]) used instead of the database
    #[arg(long, value_name = "PATH")]
    pub students_file: Option<PathBuf>,

    /// MySQL connection URL
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Import profile (exclusions, gender map, record type overrides)
    #[arg(long, value_name = "PATH")]
    pub profile: Option<PathBuf>,

    /// Name to skip before matching; repeatable
    #[arg(long = "exclude", value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Also write the run summary as JSON
    #[arg(long, value_name = "PATH")]
    pub report_json: Option<PathBuf>,

    /// Hide the progress spinner
    #[arg(short, long)]
    pub quiet: bool,
}

impl CommonArgs {
    /// Profile from `--profile` (or defaults) merged with `--exclude`
    pub fn load_profile(&self) -> Result<ImportProfile> {
        let profile = match &self.profile {
            Some(path) => ImportProfile::load(path)?,
            None => ImportProfile::default(),
        };
        Ok(profile.exclude(self.exclude.iter().cloned()))
    }

    /// Connect when a database URL was given
    pub async fn connect(&self) -> Result<Option<MySqlPool>> {
        match self.database_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => Ok(Some(create_pool(&DbConfig::new(url)).await?)),
            None => Ok(None),
        }
    }

    /// Student source: the snapshot file when given, else the database
    pub fn student_directory(&self, pool: Option<&MySqlPool>) -> Result<Box<dyn StudentDirectory>> {
        if let Some(path) = &self.students_file {
            return Ok(Box::new(FileStudentDirectory::new(path)));
        }

        match pool {
            Some(pool) => Ok(Box::new(MySqlStudentDirectory::new(pool.clone()))),
            None => Err(ImportError::config(
                "no student source: pass --students-file or --database-url (DATABASE_URL)",
            )),
        }
    }
}

/// Fingerprint the export, failing early when it is missing
pub(crate) fn fingerprint_input(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    let digest = sha256_file(path)?;
    info!(path = %path.display(), sha256 = %digest, "Reading export");
    Ok(digest)
}

/// Write the optional JSON report
pub(crate) fn write_report(summary: &RunSummary, report_json: Option<&Path>) -> Result<()> {
    if let Some(path) = report_json {
        summary.write_json(path)?;
    }
    Ok(())
}
