//! Run one bounded vehicle reconciliation pass from the command line.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use garage_backend::domain::ports::{
    ReconciliationReport, ReconciliationRequest, RunMode, VehicleReconciliationCommand,
};
use garage_backend::domain::{VehicleReconciler, VehicleReconcilerPorts};
use garage_backend::outbound::persistence::{DbPool, DieselVehicleRepository, PoolConfig};
use garage_backend::settings::{
    DvlaSettings, DvsaSettings, ReconciliationSettings, build_lookup_source, resolve_database_url,
};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

const PROGRAM_NAME: &str = "reconcile-vehicles";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Write,
    DryRun,
}

impl From<ModeArg> for RunMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Write => Self::Write,
            ModeArg::DryRun => Self::DryRun,
        }
    }
}

/// `reconcile-vehicles` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "reconcile-vehicles",
    about = "Fill blank vehicle details from the DVSA or DVLA API in bounded batches",
    version
)]
struct CliArgs {
    /// `write` merges results; `dry-run` performs lookups only.
    #[arg(long, value_enum, default_value_t = ModeArg::Write)]
    mode: ModeArg,
    /// Records per batch (1 to 500). Defaults to `RECONCILE_BATCH_SIZE` or 50.
    #[arg(long = "batch-size", value_name = "n")]
    batch_size: Option<usize>,
    /// Stop after this many batches.
    #[arg(long = "max-batches", value_name = "n")]
    max_batches: Option<u32>,
    /// Print the due count and exit without looking anything up.
    #[arg(long = "due-only")]
    due_only: bool,
    /// Database connection URL. Falls back to `DATABASE_URL` when omitted.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
}

impl CliArgs {
    fn request(&self) -> ReconciliationRequest {
        ReconciliationRequest {
            batch_size: self.batch_size,
            max_batches: self.max_batches,
            ..ReconciliationRequest::new(self.mode.into())
        }
    }
}

fn invalid_input(error: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, error.to_string())
}

fn program_args() -> [OsString; 1] {
    [OsString::from(PROGRAM_NAME)]
}

fn main() -> io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(%error, "tracing init failed");
    }

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;

    let reconciliation = ReconciliationSettings::load_from_iter(program_args())
        .map_err(invalid_input)?
        .to_config()
        .map_err(invalid_input)?;
    let dvla = DvlaSettings::load_from_iter(program_args()).map_err(invalid_input)?;
    let dvsa = DvsaSettings::load_from_iter(program_args()).map_err(invalid_input)?;
    let clock = Arc::new(DefaultClock);
    let source = build_lookup_source(dvla, dvsa, clock.clone()).map_err(invalid_input)?;

    let database_url = resolve_database_url(args.database_url.clone()).map_err(invalid_input)?;
    let pool = DbPool::new(PoolConfig::new(database_url.as_str()))
        .await
        .map_err(|error| io::Error::other(format!("create database pool: {error}")))?;

    let reconciler = VehicleReconciler::new(
        VehicleReconcilerPorts::new(source, Arc::new(DieselVehicleRepository::new(pool))),
        clock,
        reconciliation,
    );

    if args.due_only {
        let summary = reconciler
            .due_summary()
            .await
            .map_err(|error| io::Error::other(format!("count due vehicles: {error}")))?;
        println!("due={}", summary.due);
        println!("stale_before={}", summary.stale_before.to_rfc3339());
        return Ok(());
    }

    let report = reconciler
        .reconcile(args.request())
        .await
        .map_err(|error| io::Error::other(format!("reconciliation failed: {error}")))?;
    for line in report_lines(&report) {
        println!("{line}");
    }
    Ok(())
}

fn report_lines(report: &ReconciliationReport) -> Vec<String> {
    let counters = &report.counters;
    vec![
        format!("run_id={}", report.run_id),
        format!("mode={:?}", report.mode),
        format!("source={}", report.source),
        format!("started_at={}", report.started_at.to_rfc3339()),
        format!("finished_at={}", report.finished_at.to_rfc3339()),
        format!("elapsed_ms={}", report.elapsed_ms),
        format!("batches={}", report.batches),
        format!("attempted={}", counters.attempted),
        format!("updated={}", counters.updated),
        format!("skipped={}", counters.skipped),
        format!("no_data={}", counters.no_data),
        format!("failed={}", counters.failed),
        format!("rate_limited={}", counters.rate_limited),
        format!("stop_reason={:?}", report.stop_reason),
    ]
}
