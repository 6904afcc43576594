//! Reconciliation endpoints: trigger one bounded run and report the backlog.
//!
//! A run executes on a spawned task and its report is returned directly.
//! The task outlives the request, so a client that disconnects mid-run does
//! not cancel the run or release its lock early. The reconciler rejects
//! overlapping runs with `409 Conflict`.

use std::sync::Arc;

use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::ports::{
    DueSummary, ReconciliationCounters, ReconciliationReport, ReconciliationRequest, RunMode,
    StopReason, VehicleReconciliationCommand,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Run mode accepted on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum RunModeBody {
    /// Merge results and stamp `last_checked_at`.
    #[default]
    Write,
    /// Perform lookups without touching the store.
    DryRun,
}

impl From<RunModeBody> for RunMode {
    fn from(value: RunModeBody) -> Self {
        match value {
            RunModeBody::Write => Self::Write,
            RunModeBody::DryRun => Self::DryRun,
        }
    }
}

impl From<RunMode> for RunModeBody {
    fn from(value: RunMode) -> Self {
        match value {
            RunMode::Write => Self::Write,
            RunMode::DryRun => Self::DryRun,
        }
    }
}

/// Request body for `POST /api/v1/reconciliation/runs`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StartReconciliationRequest {
    /// Defaults to `write`.
    #[serde(default)]
    pub mode: RunModeBody,
    /// Records per batch, 1 to 500. Defaults to the configured size.
    pub batch_size: Option<usize>,
    /// Upper bound on batches for this run.
    pub max_batches: Option<u32>,
}

impl From<StartReconciliationRequest> for ReconciliationRequest {
    fn from(value: StartReconciliationRequest) -> Self {
        Self {
            batch_size: value.batch_size,
            max_batches: value.max_batches,
            ..Self::new(value.mode.into())
        }
    }
}

/// Per-outcome counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationCountersBody {
    pub attempted: u64,
    pub updated: u64,
    pub skipped: u64,
    pub no_data: u64,
    pub failed: u64,
    pub rate_limited: u64,
}

impl From<ReconciliationCounters> for ReconciliationCountersBody {
    fn from(value: ReconciliationCounters) -> Self {
        Self {
            attempted: value.attempted,
            updated: value.updated,
            skipped: value.skipped,
            no_data: value.no_data,
            failed: value.failed,
            rate_limited: value.rate_limited,
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum StopReasonBody {
    Exhausted,
    RuntimeExceeded,
    BatchLimitReached,
    RateLimitBackoff,
}

impl From<StopReason> for StopReasonBody {
    fn from(value: StopReason) -> Self {
        match value {
            StopReason::Exhausted => Self::Exhausted,
            StopReason::RuntimeExceeded => Self::RuntimeExceeded,
            StopReason::BatchLimitReached => Self::BatchLimitReached,
            StopReason::RateLimitBackoff => Self::RateLimitBackoff,
        }
    }
}

/// Run report payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReportBody {
    pub run_id: Uuid,
    pub mode: RunModeBody,
    #[schema(example = "dvsa")]
    pub source: String,
    #[schema(value_type = String, format = DateTime)]
    pub started_at: DateTime<Utc>,
    #[schema(value_type = String, format = DateTime)]
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub batches: u32,
    pub counters: ReconciliationCountersBody,
    pub stop_reason: StopReasonBody,
}

impl From<ReconciliationReport> for ReconciliationReportBody {
    fn from(value: ReconciliationReport) -> Self {
        Self {
            run_id: value.run_id,
            mode: value.mode.into(),
            source: value.source,
            started_at: value.started_at,
            finished_at: value.finished_at,
            elapsed_ms: value.elapsed_ms,
            batches: value.batches,
            counters: value.counters.into(),
            stop_reason: value.stop_reason.into(),
        }
    }
}

/// Response body for a completed run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationRunResponse {
    pub success: bool,
    pub report: ReconciliationReportBody,
}

/// Response body for the due-vehicle count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DueVehiclesResponse {
    pub success: bool,
    pub due: u64,
    #[schema(value_type = String, format = DateTime)]
    pub stale_before: DateTime<Utc>,
}

impl From<DueSummary> for DueVehiclesResponse {
    fn from(value: DueSummary) -> Self {
        Self {
            success: true,
            due: value.due,
            stale_before: value.stale_before,
        }
    }
}

/// Run `request` on its own task and wait for the report.
///
/// Dropping the returned future leaves the run going to completion.
pub(crate) async fn run_detached(
    reconciliation: Arc<dyn VehicleReconciliationCommand>,
    request: ReconciliationRequest,
) -> Result<ReconciliationReport, Error> {
    let run_id = request.run_id;
    actix_web::rt::spawn(async move { reconciliation.reconcile(request).await })
        .await
        .map_err(|join_error| {
            error!(%run_id, %join_error, "reconciliation task did not complete");
            Error::internal("reconciliation run terminated unexpectedly")
        })?
}

/// Run one bounded reconciliation pass and return its report.
#[utoipa::path(
    post,
    path = "/api/v1/reconciliation/runs",
    request_body = StartReconciliationRequest,
    responses(
        (status = 200, description = "Run completed", body = ReconciliationRunResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 409, description = "A run is already in progress", body = ErrorSchema),
        (status = 503, description = "Database or vehicle API unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["reconciliation"],
    operation_id = "startReconciliationRun"
)]
#[post("/reconciliation/runs")]
pub async fn start_reconciliation_run(
    state: web::Data<HttpState>,
    payload: web::Json<StartReconciliationRequest>,
) -> ApiResult<HttpResponse> {
    let request = ReconciliationRequest::from(payload.into_inner());
    info!(run_id = %request.run_id, mode = ?request.mode, "reconciliation run requested");

    let report = run_detached(state.reconciliation.clone(), request).await?;

    Ok(HttpResponse::Ok().json(ReconciliationRunResponse {
        success: true,
        report: report.into(),
    }))
}

/// Count vehicles currently due for reconciliation.
#[utoipa::path(
    get,
    path = "/api/v1/reconciliation/due",
    responses(
        (status = 200, description = "Due vehicle count", body = DueVehiclesResponse),
        (status = 503, description = "Database unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["reconciliation"],
    operation_id = "countDueVehicles"
)]
#[get("/reconciliation/due")]
pub async fn count_due_vehicles(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let summary = state.reconciliation.due_summary().await?;
    Ok(HttpResponse::Ok().json(DueVehiclesResponse::from(summary)))
}

#[cfg(test)]
#[path = "reconciliation_tests.rs"]
mod tests;
