//! P-EAK record import
//!
//! Loads athletic test records from a CSV export into `student_records`.
//!
//! # Overview
//!
//! - **Script**: match rows to students by name and write an `INSERT`
//!   script to apply by hand (`peak-import script`)
//! - **Restore**: match rows by name and gender within one academy, then
//!   replace that academy's records in a single transaction
//!   (`peak-import restore`)
//!
//! Both share the same pipeline: [`export::ExportReader`] streams rows,
//! [`reconcile::Reconciler`] resolves them against a
//! [`students::StudentIndex`], and a [`sink::RecordSink`] receives the
//! resulting records.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod progress;
pub mod reconcile;
pub mod record_types;
pub mod report;
pub mod sink;
pub mod students;

pub use config::ImportProfile;
pub use error::{ImportError, Result};
pub use reconcile::{MissingDatePolicy, ReconcileOptions, Reconciler};
pub use report::{ReconcileReport, RunSummary};
pub use students::{MatchBy, StudentIndex};

use clap::{Parser, Subcommand};
use commands::restore::RestoreArgs;
use commands::script::ScriptArgs;

/// P-EAK test record import
#[derive(Parser, Debug)]
#[command(name = "peak-import")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an INSERT script, matching students by name
    Script(ScriptArgs),

    /// Replace an academy's records, matching students by name and gender
    Restore(RestoreArgs),
}

/// Run the selected subcommand
pub async fn execute(command: Commands) -> Result<RunSummary> {
    match command {
        Commands::Script(args) => commands::script::run(args).await,
        Commands::Restore(args) => commands::restore::run(args).await,
    }
}
