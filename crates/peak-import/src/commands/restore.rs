//! `peak-import restore`: replace one academy's records in place

use crate::commands::{fingerprint_input, write_report, CommonArgs};
use crate::error::{ImportError, Result};
use crate::export::ExportReader;
use crate::progress::row_spinner;
use crate::reconcile::{MissingDatePolicy, ReconcileOptions, Reconciler};
use crate::report::{RunMode, RunSummary};
use crate::sink::mysql::count_records;
use crate::sink::{MemoryRecordSink, MemoryStore, MySqlRecordSink, RecordSink};
use crate::students::{MatchBy, StudentIndex};
use clap::Args;
use peak_common::AcademyId;
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct RestoreArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Academy whose records are replaced
    #[arg(long, value_name = "ID")]
    pub academy_id: AcademyId,

    /// Reconcile and report without writing to the database
    #[arg(long)]
    pub dry_run: bool,
}

/// Match rows by name and gender within one academy, then delete the
/// academy's records and upsert the reconciled set in one transaction.
///
/// Rows without a parseable date are attributed to today.
pub async fn run(args: RestoreArgs) -> Result<RunSummary> {
    let common = &args.common;
    let academy_id = args.academy_id;
    let input_sha256 = fingerprint_input(&common.csv)?;
    let profile = common.load_profile()?;
    let record_types = profile.record_type_map()?;

    let pool = common.connect().await?;
    if pool.is_none() && !args.dry_run {
        return Err(ImportError::config(
            "restore writes to the database: pass --database-url (DATABASE_URL) or use --dry-run",
        ));
    }

    let directory = common.student_directory(pool.as_ref())?;
    let students = directory.load(Some(academy_id)).await?;
    let index = StudentIndex::build(students, MatchBy::NameAndGender);
    info!(
        academy_id,
        students = index.len(),
        source = %directory.describe(),
        "Student directory loaded"
    );
    if index.is_empty() {
        warn!(academy_id, "No students found for academy; every row will be unmatched");
    }

    let options = ReconcileOptions {
        exclusions: profile.exclude_names.clone(),
        gender_map: profile.gender_map(),
        date_policy: MissingDatePolicy::Today,
        academy_id: Some(academy_id),
    };
    let reconciler =
        Reconciler::new(index, options).with_progress(row_spinner("Reconciling", common.quiet));

    let mut export = ExportReader::open(&common.csv, &record_types, true)?;
    let missing_columns = export.layout().missing_measurements().to_vec();

    let (report, deleted_records) = match (&pool, args.dry_run) {
        (Some(pool), false) => {
            let mut sink = MySqlRecordSink::begin_replace(pool, academy_id).await?;
            let report = reconciler.run(&mut export, &mut sink).await?;
            sink.finish().await?;
            (report, Some(sink.deleted()))
        },
        (pool, _) => {
            let would_delete = match pool {
                Some(pool) => Some(count_records(pool, academy_id).await?),
                None => None,
            };

            let mut store = MemoryStore::new();
            let mut sink = MemoryRecordSink::replacing(&mut store, academy_id);
            let report = reconciler.run(&mut export, &mut sink).await?;
            sink.finish().await?;
            info!(academy_id, distinct_records = store.len(), "Dry run complete, nothing written");
            (report, would_delete)
        },
    };

    let summary = RunSummary {
        mode: RunMode::Restore,
        input: common.csv.clone(),
        input_sha256,
        student_source: directory.describe(),
        students_indexed: reconciler.index().len(),
        duplicate_students: reconciler.index().duplicate_keys(),
        missing_columns,
        dry_run: args.dry_run,
        output: None,
        academy_id: Some(academy_id),
        deleted_records,
        report,
    };
    write_report(&summary, common.report_json.as_deref())?;

    Ok(summary)
}
