//! Parameterised bulk vehicle importer.
//!
//! Rows arrive already parsed (see `inbound::csv_import`). The importer
//! normalises registrations, drops in-file duplicates, and upserts in chunks
//! with a pause between chunks. A failing chunk is counted and skipped; the
//! rest of the import continues.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::ports::{VehicleImportRecord, VehicleImportRepository};
use crate::domain::{ReconciliationSleeper, Registration, TokioSleeper, VehicleDetails};

/// Chunking and pacing for one import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleImportConfig {
    /// Rows per upsert statement.
    pub batch_size: usize,
    /// Pause between chunks.
    pub inter_batch_delay: Duration,
}

impl Default for VehicleImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 200,
            inter_batch_delay: Duration::from_millis(100),
        }
    }
}

/// One parsed source row before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleImportRow {
    /// 1-based source line, for diagnostics.
    pub line: u64,
    /// Registration as written in the source.
    pub registration: String,
    /// Parsed details; blanks are `None`.
    pub details: VehicleDetails,
}

/// A row rejected before reaching the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedImportRow {
    pub line: u64,
    pub reason: String,
}

/// Totals for one import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleImportReport {
    pub total_rows: usize,
    pub inserted: usize,
    pub merged: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub batches: usize,
    pub rejected: Vec<RejectedImportRow>,
}

/// Imports vehicles through the [`VehicleImportRepository`] port.
pub struct VehicleImportService {
    repository: Arc<dyn VehicleImportRepository>,
    sleeper: Arc<dyn ReconciliationSleeper>,
    config: VehicleImportConfig,
}

impl VehicleImportService {
    /// Build an importer that pauses with Tokio timers.
    pub fn new(repository: Arc<dyn VehicleImportRepository>, config: VehicleImportConfig) -> Self {
        Self::with_sleeper(repository, Arc::new(TokioSleeper), config)
    }

    /// Build an importer with an injected sleeper.
    pub fn with_sleeper(
        repository: Arc<dyn VehicleImportRepository>,
        sleeper: Arc<dyn ReconciliationSleeper>,
        config: VehicleImportConfig,
    ) -> Self {
        Self {
            repository,
            sleeper,
            config: VehicleImportConfig {
                batch_size: config.batch_size.max(1),
                ..config
            },
        }
    }

    /// Validate, de-duplicate, and upsert `rows`.
    pub async fn import(&self, rows: Vec<VehicleImportRow>) -> VehicleImportReport {
        let mut report = VehicleImportReport {
            total_rows: rows.len(),
            ..VehicleImportReport::default()
        };
        let records = self.normalise(rows, &mut report);

        for (index, chunk) in records.chunks(self.config.batch_size).enumerate() {
            if index > 0 {
                self.sleeper.sleep(self.config.inter_batch_delay).await;
            }
            report.batches += 1;
            match self.repository.upsert_vehicles(chunk).await {
                Ok(summary) => {
                    debug!(
                        batch = report.batches,
                        inserted = summary.inserted,
                        merged = summary.merged,
                        "vehicle import chunk upserted"
                    );
                    report.inserted += summary.inserted;
                    report.merged += summary.merged;
                }
                Err(error) => {
                    warn!(batch = report.batches, rows = chunk.len(), %error, "vehicle import chunk failed");
                    report.failed += chunk.len();
                }
            }
        }

        info!(
            total_rows = report.total_rows,
            inserted = report.inserted,
            merged = report.merged,
            invalid = report.invalid,
            duplicates = report.duplicates,
            failed = report.failed,
            batches = report.batches,
            "vehicle import finished"
        );
        report
    }

    fn normalise(
        &self,
        rows: Vec<VehicleImportRow>,
        report: &mut VehicleImportReport,
    ) -> Vec<VehicleImportRecord> {
        let mut seen = HashSet::<Registration>::new();
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let registration = match Registration::parse(&row.registration) {
                Ok(registration) => registration,
                Err(error) => {
                    report.invalid += 1;
                    report.rejected.push(RejectedImportRow {
                        line: row.line,
                        reason: error.to_string(),
                    });
                    continue;
                }
            };
            if !seen.insert(registration.clone()) {
                report.duplicates += 1;
                continue;
            }
            records.push(VehicleImportRecord {
                registration,
                details: row.details,
            });
        }
        records
    }
}
