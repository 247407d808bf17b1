//! `peak-import script`: generate an INSERT script for manual review

use crate::commands::{fingerprint_input, write_report, CommonArgs};
use crate::error::Result;
use crate::export::ExportReader;
use crate::progress::row_spinner;
use crate::reconcile::{MissingDatePolicy, ReconcileOptions, Reconciler};
use crate::report::{RunMode, RunSummary};
use crate::sink::{RecordSink, SqlScriptSink};
use crate::students::{MatchBy, StudentIndex};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct ScriptArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// SQL file to write
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,
}

/// Match rows by name and write one INSERT per measurement.
///
/// Rows without a parseable date are skipped. The database is only read.
pub async fn run(args: ScriptArgs) -> Result<RunSummary> {
    let common = &args.common;
    let input_sha256 = fingerprint_input(&common.csv)?;
    let profile = common.load_profile()?;
    let record_types = profile.record_type_map()?;

    let pool = if common.students_file.is_some() {
        None
    } else {
        common.connect().await?
    };
    let directory = common.student_directory(pool.as_ref())?;
    let students = directory.load(None).await?;
    let index = StudentIndex::build(students, MatchBy::Name);
    info!(students = index.len(), source = %directory.describe(), "Student directory loaded");

    let options = ReconcileOptions {
        exclusions: profile.exclude_names.clone(),
        gender_map: profile.gender_map(),
        date_policy: MissingDatePolicy::SkipRow,
        academy_id: None,
    };
    let reconciler =
        Reconciler::new(index, options).with_progress(row_spinner("Reconciling", common.quiet));

    let mut export = ExportReader::open(&common.csv, &record_types, false)?;
    let missing_columns = export.layout().missing_measurements().to_vec();
    let mut sink = SqlScriptSink::new(&args.output);
    let report = reconciler.run(&mut export, &mut sink).await?;
    sink.finish().await?;

    let summary = RunSummary {
        mode: RunMode::Script,
        input: common.csv.clone(),
        input_sha256,
        student_source: directory.describe(),
        students_indexed: reconciler.index().len(),
        duplicate_students: reconciler.index().duplicate_keys(),
        missing_columns,
        dry_run: false,
        output: Some(args.output.clone()),
        academy_id: None,
        deleted_records: None,
        report,
    };
    write_report(&summary, common.report_json.as_deref())?;

    Ok(summary)
}
