//! End-to-end reconciliation over the HTTP surface.
//!
//! Real handlers and the real reconciler run against in-memory driven ports,
//! so these tests cover wiring and envelopes without PostgreSQL or network
//! access.

use std::sync::Arc;

use actix_web::{App, test as actix_test, web};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use garage_backend::domain::ports::{
    ReconciliationRequest, RunMode, VehicleLookupError, VehicleReconciliationCommand,
    VehicleRepository,
};
use garage_backend::domain::{
    ReconciliationConfig, ReconciliationRuntime, VehicleDetails, VehicleImportConfig,
    VehicleImportService, VehicleLookupService, VehicleReconciler, VehicleReconcilerPorts,
    VehicleRecord,
};
use garage_backend::inbound::csv_import::parse_vehicle_csv;
use garage_backend::inbound::http::configure_api;
use garage_backend::inbound::http::state::{HttpState, HttpStatePorts};
use garage_backend::inbound::http::validation::json_config;
use garage_backend::test_support::reconciliation::{
    ImmediateSleeper, InMemoryVehicleRepository, MutableClock, NoJitter, ScriptedLookupSource,
    registration,
};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0)
        .single()
        .expect("valid time")
}

fn dvsa_snapshot() -> VehicleDetails {
    VehicleDetails {
        make: Some("FORD".to_owned()),
        model: Some("FOCUS".to_owned()),
        colour: Some("BLUE".to_owned()),
        fuel_type: Some("PETROL".to_owned()),
        year_of_manufacture: Some(2016),
        engine_capacity_cc: Some(999),
        mot_expiry_date: NaiveDate::from_ymd_opt(2027, 4, 30),
        tax_status: None,
        tax_due_date: None,
    }
}

fn http_state(
    now: DateTime<Utc>,
    repository: Arc<InMemoryVehicleRepository>,
    source: Arc<ScriptedLookupSource>,
) -> web::Data<HttpState> {
    let reconciler = VehicleReconciler::with_runtime(
        VehicleReconcilerPorts::new(source.clone(), repository),
        Arc::new(MutableClock::new(now)),
        ReconciliationRuntime {
            sleeper: Arc::new(ImmediateSleeper),
            jitter: Arc::new(NoJitter),
        },
        ReconciliationConfig::default(),
    );
    web::Data::new(HttpState::new(HttpStatePorts {
        reconciliation: Arc::new(reconciler),
        lookup: Arc::new(VehicleLookupService::new(source)),
    }))
}

async fn call(state: web::Data<HttpState>, request: actix_test::TestRequest) -> (u16, Value) {
    let app = actix_test::init_service(
        App::new()
            .app_data(state)
            .app_data(json_config())
            .service(web::scope("/api/v1").configure(configure_api)),
    )
    .await;
    let response = actix_test::call_service(&app, request.to_request()).await;
    let status = response.status().as_u16();
    let body: Value = actix_test::read_body_json(response).await;
    (status, body)
}

#[rstest]
#[actix_web::test]
async fn write_run_fills_blanks_and_clears_the_backlog(now: DateTime<Utc>) {
    let mut partial = VehicleRecord::unchecked(registration("AB12CDE"));
    partial.details.colour = Some("RED".to_owned());
    let repository = Arc::new(InMemoryVehicleRepository::with_records([
        partial,
        VehicleRecord::unchecked(registration("XY34FGH")),
    ]));
    let source = Arc::new(
        ScriptedLookupSource::default().found(registration("AB12CDE"), dvsa_snapshot()),
    );
    let state = http_state(now, repository.clone(), source.clone());

    let (status, body) = call(
        state.clone(),
        actix_test::TestRequest::post()
            .uri("/api/v1/reconciliation/runs")
            .set_json(json!({ "mode": "write" })),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["report"]["source"], json!("scripted"));
    assert_eq!(body["report"]["stopReason"], json!("exhausted"));
    assert_eq!(body["report"]["counters"]["attempted"], json!(2));
    assert_eq!(body["report"]["counters"]["updated"], json!(1));
    assert_eq!(body["report"]["counters"]["noData"], json!(1));

    let merged = repository
        .record(&registration("AB12CDE"))
        .expect("record kept");
    assert_eq!(merged.details.colour.as_deref(), Some("RED"));
    assert_eq!(merged.details.make.as_deref(), Some("FORD"));
    assert_eq!(merged.last_checked_at, Some(now));
    let untouched = repository
        .record(&registration("XY34FGH"))
        .expect("record kept");
    assert_eq!(untouched.details, VehicleDetails::default());
    assert_eq!(untouched.last_checked_at, Some(now));

    let (status, body) = call(
        state,
        actix_test::TestRequest::get().uri("/api/v1/reconciliation/due"),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["due"], json!(0));
}

#[rstest]
#[actix_web::test]
async fn dry_run_leaves_the_store_untouched(now: DateTime<Utc>) {
    let repository = Arc::new(InMemoryVehicleRepository::with_records([
        VehicleRecord::unchecked(registration("AB12CDE")),
    ]));
    let source = Arc::new(
        ScriptedLookupSource::default().found(registration("AB12CDE"), dvsa_snapshot()),
    );
    let state = http_state(now, repository.clone(), source.clone());

    let (status, body) = call(
        state,
        actix_test::TestRequest::post()
            .uri("/api/v1/reconciliation/runs")
            .set_json(json!({ "mode": "dryRun", "maxBatches": 1 })),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["report"]["mode"], json!("dryRun"));
    assert_eq!(body["report"]["counters"]["updated"], json!(1));
    assert_eq!(source.calls(), vec![registration("AB12CDE")]);
    assert_eq!(repository.write_count(), 0);
    let stored = repository
        .record(&registration("AB12CDE"))
        .expect("record kept");
    assert_eq!(stored.last_checked_at, None);
}

#[rstest]
#[actix_web::test]
async fn lookup_normalises_the_path_and_returns_the_snapshot(now: DateTime<Utc>) {
    let source = Arc::new(
        ScriptedLookupSource::default().found(registration("AB12CDE"), dvsa_snapshot()),
    );
    let state = http_state(now, Arc::new(InMemoryVehicleRepository::default()), source);

    let (status, body) = call(
        state,
        actix_test::TestRequest::get().uri("/api/v1/vehicles/ab12%20cde/lookup"),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["found"], json!(true));
    assert_eq!(body["registration"], json!("AB12CDE"));
    assert_eq!(body["vehicle"]["make"], json!("FORD"));
    assert_eq!(body["vehicle"]["motExpiryDate"], json!("2027-04-30"));
}

#[rstest]
#[actix_web::test]
async fn lookup_reports_upstream_outage_as_unavailable(now: DateTime<Utc>) {
    let source = Arc::new(ScriptedLookupSource::with_fallback(Err(
        VehicleLookupError::transport("connection refused"),
    )));
    let state = http_state(now, Arc::new(InMemoryVehicleRepository::default()), source);

    let (status, body) = call(
        state,
        actix_test::TestRequest::get().uri("/api/v1/vehicles/AB12CDE/lookup"),
    )
    .await;

    assert_eq!(status, 503);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("service_unavailable"));
}

#[rstest]
#[tokio::test]
async fn imported_rows_are_reconciled_without_losing_csv_values(now: DateTime<Utc>) {
    let repository = Arc::new(InMemoryVehicleRepository::default());
    let csv = "Reg,Colour,MOT Expiry\nab12 cde,Green,01/02/2027\nnot a plate!,Red,\n";
    let rows = parse_vehicle_csv(csv.as_bytes()).expect("csv parses");
    let importer = VehicleImportService::with_sleeper(
        repository.clone(),
        Arc::new(ImmediateSleeper),
        VehicleImportConfig::default(),
    );

    let import = importer.import(rows).await;
    assert_eq!(import.inserted, 1);
    assert_eq!(import.invalid, 1);
    assert_eq!(import.rejected.first().map(|row| row.line), Some(3));

    let source = Arc::new(
        ScriptedLookupSource::default().found(registration("AB12CDE"), dvsa_snapshot()),
    );
    let reconciler = VehicleReconciler::with_runtime(
        VehicleReconcilerPorts::new(source, repository.clone()),
        Arc::new(MutableClock::new(now)),
        ReconciliationRuntime {
            sleeper: Arc::new(ImmediateSleeper),
            jitter: Arc::new(NoJitter),
        },
        ReconciliationConfig::default(),
    );
    let due_before = repository
        .count_due(now)
        .await
        .expect("count succeeds");
    assert_eq!(due_before, 1);

    let report = reconciler
        .reconcile(ReconciliationRequest::new(RunMode::Write))
        .await
        .expect("run succeeds");
    assert_eq!(report.counters.updated, 1);

    let stored = repository
        .record(&registration("AB12CDE"))
        .expect("imported record");
    assert_eq!(stored.details.colour.as_deref(), Some("Green"));
    assert_eq!(stored.details.mot_expiry_date, NaiveDate::from_ymd_opt(2027, 2, 1));
    assert_eq!(stored.details.make.as_deref(), Some("FORD"));
}
