//! Tests for reconciliation HTTP handlers.

use super::*;
use crate::domain::ports::{MockVehicleLookupQuery, MockVehicleReconciliationCommand};
use crate::domain::{Error, MAX_BATCH_SIZE};
use crate::inbound::http::test_utils::{mock_state, test_app};
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use async_trait::async_trait;
use chrono::TimeZone;
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

fn instant(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn sample_report(request: &ReconciliationRequest) -> ReconciliationReport {
    ReconciliationReport {
        run_id: request.run_id,
        mode: request.mode,
        source: "dvla".to_owned(),
        started_at: instant(9),
        finished_at: instant(10),
        elapsed_ms: 3_600_000,
        batches: 2,
        counters: ReconciliationCounters {
            attempted: 3,
            updated: 1,
            skipped: 0,
            no_data: 1,
            failed: 1,
            rate_limited: 0,
        },
        stop_reason: StopReason::Exhausted,
    }
}

async fn post_run(
    reconciliation: MockVehicleReconciliationCommand,
    body: Value,
) -> (StatusCode, Value) {
    let app = actix_test::init_service(test_app(mock_state(
        reconciliation,
        MockVehicleLookupQuery::new(),
    )))
    .await;
    let request = actix_test::TestRequest::post()
        .uri("/api/v1/reconciliation/runs")
        .set_json(&body)
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    let status = response.status();
    let body = actix_test::read_body(response).await;
    (status, serde_json::from_slice(&body).expect("json body"))
}

#[rstest]
#[actix_web::test]
async fn run_returns_report_envelope() {
    let mut reconciliation = MockVehicleReconciliationCommand::new();
    reconciliation
        .expect_reconcile()
        .withf(|request| {
            request.mode == RunMode::DryRun
                && request.batch_size == Some(2)
                && request.max_batches == Some(5)
        })
        .times(1)
        .returning(|request| Ok(sample_report(&request)));

    let (status, body) = post_run(
        reconciliation,
        json!({ "mode": "dryRun", "batchSize": 2, "maxBatches": 5 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["report"]["mode"], "dryRun");
    assert_eq!(body["report"]["stopReason"], "exhausted");
    assert_eq!(
        body["report"]["counters"],
        json!({
            "attempted": 3,
            "updated": 1,
            "skipped": 0,
            "noData": 1,
            "failed": 1,
            "rateLimited": 0
        })
    );
}

#[rstest]
#[actix_web::test]
async fn mode_defaults_to_write() {
    let mut reconciliation = MockVehicleReconciliationCommand::new();
    reconciliation
        .expect_reconcile()
        .withf(|request| request.mode == RunMode::Write && request.batch_size.is_none())
        .times(1)
        .returning(|request| Ok(sample_report(&request)));

    let (status, body) = post_run(reconciliation, json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["mode"], "write");
}

#[rstest]
#[actix_web::test]
async fn domain_validation_errors_surface_as_bad_request() {
    let mut reconciliation = MockVehicleReconciliationCommand::new();
    reconciliation.expect_reconcile().times(1).returning(|_| {
        Err(
            Error::invalid_request(format!("batch size must be between 1 and {MAX_BATCH_SIZE}"))
                .with_details(json!({ "field": "batchSize", "code": "invalid_batch_size" })),
        )
    });

    let (status, body) = post_run(reconciliation, json!({ "batchSize": 900 })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["details"]["field"], "batchSize");
}

#[rstest]
#[case(json!({ "mode": "sideways" }))]
#[case(json!({ "batchSize": -1 }))]
#[case(json!({ "unexpected": true }))]
#[actix_web::test]
async fn malformed_bodies_are_rejected_before_the_reconciler(#[case] body: Value) {
    let mut reconciliation = MockVehicleReconciliationCommand::new();
    reconciliation.expect_reconcile().never();

    let (status, payload) = post_run(reconciliation, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["code"], "invalid_request");
    assert_eq!(payload["details"]["code"], "invalid_body");
}

#[rstest]
#[actix_web::test]
async fn overlapping_run_maps_to_conflict() {
    let mut reconciliation = MockVehicleReconciliationCommand::new();
    reconciliation
        .expect_reconcile()
        .returning(|_| Err(Error::conflict("a reconciliation run is already in progress")));

    let (status, body) = post_run(reconciliation, json!({})).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[rstest]
#[actix_web::test]
async fn due_count_is_reported() {
    let mut reconciliation = MockVehicleReconciliationCommand::new();
    reconciliation.expect_due_summary().times(1).returning(|| {
        Ok(DueSummary {
            due: 42,
            stale_before: instant(8),
        })
    });
    let app = actix_test::init_service(test_app(mock_state(
        reconciliation,
        MockVehicleLookupQuery::new(),
    )))
    .await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/reconciliation/due")
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["due"], 42);
    assert_eq!(body["staleBefore"], "2026-10-01T08:00:00Z");
}

/// Holds each run until `release` is notified.
#[derive(Default)]
struct GatedReconciliation {
    release: Notify,
    finished: Notify,
    completed: AtomicBool,
}

#[async_trait]
impl VehicleReconciliationCommand for GatedReconciliation {
    async fn reconcile(
        &self,
        request: ReconciliationRequest,
    ) -> Result<ReconciliationReport, Error> {
        self.release.notified().await;
        self.completed.store(true, Ordering::SeqCst);
        self.finished.notify_one();
        Ok(sample_report(&request))
    }

    async fn due_summary(&self) -> Result<DueSummary, Error> {
        Err(Error::internal("not used"))
    }
}

#[rstest]
#[actix_web::test]
async fn run_continues_after_the_caller_stops_waiting() {
    let command = Arc::new(GatedReconciliation::default());

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        run_detached(command.clone(), ReconciliationRequest::new(RunMode::Write)),
    )
    .await;
    assert!(abandoned.is_err(), "run should still be waiting on the gate");
    assert!(!command.completed.load(Ordering::SeqCst));

    command.release.notify_one();
    tokio::time::timeout(Duration::from_secs(5), command.finished.notified())
        .await
        .expect("detached run completes");
    assert!(command.completed.load(Ordering::SeqCst));
}

#[rstest]
#[actix_web::test]
async fn detached_run_returns_the_report() {
    let command = Arc::new(GatedReconciliation::default());
    command.release.notify_one();
    let request = ReconciliationRequest::new(RunMode::DryRun);
    let run_id = request.run_id;

    let report = run_detached(command, request).await.expect("run succeeds");

    assert_eq!(report.run_id, run_id);
    assert_eq!(report.mode, RunMode::DryRun);
}
