//! Import garage vehicles from a CSV export into PostgreSQL.
//!
//! Existing rows are merged: stored values win and blanks are filled.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cap_std::{ambient_authority, fs::Dir};
use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use garage_backend::domain::{
    VehicleImportConfig, VehicleImportReport, VehicleImportRow, VehicleImportService,
};
use garage_backend::inbound::csv_import::parse_vehicle_csv;
use garage_backend::outbound::persistence::{DbPool, DieselVehicleImportRepository, PoolConfig};
use garage_backend::settings::resolve_database_url;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `import-vehicles` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "import-vehicles",
    about = "Upsert vehicles from a CSV file without overwriting stored details",
    version
)]
struct CliArgs {
    /// CSV file with a registration column and optional detail columns.
    #[arg(long = "file", value_name = "path")]
    file: PathBuf,
    /// Rows per upsert statement.
    #[arg(long = "batch-size", value_name = "n", default_value_t = 200)]
    batch_size: usize,
    /// Pause between upsert statements in milliseconds.
    #[arg(long = "delay-ms", value_name = "ms", default_value_t = 100)]
    delay_ms: u64,
    /// Database connection URL. Falls back to `DATABASE_URL` when omitted.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
}

impl CliArgs {
    fn import_config(&self) -> Result<VehicleImportConfig> {
        if self.batch_size == 0 {
            return Err(eyre!("--batch-size must be at least 1"));
        }
        Ok(VehicleImportConfig {
            batch_size: self.batch_size,
            inter_batch_delay: Duration::from_millis(self.delay_ms),
        })
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!(%error, "tracing init failed");
    }

    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build Tokio runtime")?;
    runtime.block_on(run(args))
}

async fn run(args: CliArgs) -> Result<()> {
    let config = args.import_config()?;
    let rows = read_rows(&args.file)?;
    info!(rows = rows.len(), path = %args.file.display(), "parsed vehicle CSV");

    let database_url = resolve_database_url(args.database_url).wrap_err("resolve database URL")?;
    let pool = DbPool::new(PoolConfig::new(database_url.as_str()))
        .await
        .wrap_err("failed to create database pool")?;

    let service = VehicleImportService::new(Arc::new(DieselVehicleImportRepository::new(pool)), config);
    let report = service.import(rows).await;
    for rejected in &report.rejected {
        warn!(line = rejected.line, reason = %rejected.reason, "row rejected");
    }
    for line in summary_lines(&report) {
        println!("{line}");
    }
    if report.failed > 0 {
        return Err(eyre!("{} rows failed to import", report.failed));
    }
    Ok(())
}

fn read_rows(path: &Path) -> Result<Vec<VehicleImportRow>> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("input path must name a file: {}", path.display()))?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority())
        .wrap_err_with(|| format!("open input directory {}", parent.display()))?;
    let file = directory
        .open(Path::new(file_name))
        .wrap_err_with(|| format!("open input file {}", path.display()))?;
    parse_vehicle_csv(file.into_std()).wrap_err_with(|| format!("parse {}", path.display()))
}

fn summary_lines(report: &VehicleImportReport) -> Vec<String> {
    vec![
        format!("total_rows={}", report.total_rows),
        format!("inserted={}", report.inserted),
        format!("merged={}", report.merged),
        format!("invalid={}", report.invalid),
        format!("duplicates={}", report.duplicates),
        format!("failed={}", report.failed),
        format!("batches={}", report.batches),
    ]
}
