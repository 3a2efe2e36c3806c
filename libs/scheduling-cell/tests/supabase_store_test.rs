// libs/scheduling-cell/tests/supabase_store_test.rs
mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::{json, Value};
use wiremock::matchers::{any, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use scheduling_cell::models::BlockSpec;
use scheduling_cell::{FixedClock, SchedulingEngine, SchedulingError, SupabaseLedger};
use shared_config::SchedulingConfig;
use shared_database::SupabaseClient;
use shared_utils::test_utils::TestConfig;

fn engine_for(server: &MockServer) -> SchedulingEngine {
    engine_with(server, SchedulingConfig::default())
}

fn engine_with(server: &MockServer, scheduling: SchedulingConfig) -> SchedulingEngine {
    let config = TestConfig { scheduling, ..TestConfig::default() }
        .with_supabase_url(&server.uri())
        .to_app_config();
    let client = Arc::new(SupabaseClient::with_service_role(&config));

    SchedulingEngine::new(
        &config.scheduling,
        Arc::new(SupabaseLedger::new(client)),
        Arc::new(FixedClock(now())),
    )
    .unwrap()
}

fn appointment_row(id: i64, time: &str) -> Value {
    json!({
        "id": id,
        "appointment_code": "APT-123456-001",
        "provider_id": CARDIOLOGIST,
        "client_id": ALICE,
        "appointment_date": "2026-02-20",
        "appointment_time": time,
        "status": "booked",
        "reason_for_visit": null,
        "notes": null,
        "created_at": "2026-02-19T08:00:00",
        "updated_at": "2026-02-19T08:00:00"
    })
}

async fn mount_provider(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/providers"))
        .and(query_param("id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": CARDIOLOGIST,
            "full_name": "Dr. Amara Okafor",
            "specialization": "Cardiology"
        }])))
        .mount(server)
        .await;
}

async fn mount_empty(server: &MockServer, table: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/rest/v1/{}", table)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_booking_is_written_with_service_role_and_representation() {
    let server = MockServer::start().await;
    mount_provider(&server).await;
    mount_empty(&server, "appointments").await;
    mount_empty(&server, "unavailability_blocks").await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("apikey", "test-service-key"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "provider_id": CARDIOLOGIST,
            "client_id": ALICE,
            "appointment_date": "2026-02-20",
            "appointment_time": "10:00",
            "status": "booked"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([appointment_row(42, "10:00:00")])))
        .expect(1)
        .mount(&server)
        .await;

    let appointment = engine_for(&server)
        .create_booking(ALICE, CARDIOLOGIST, tomorrow(), t(10, 0), None)
        .await
        .unwrap();

    assert_eq!(appointment.id, 42);
    assert_eq!(appointment.appointment_time, t(10, 0));
}

#[tokio::test]
async fn test_unique_index_violation_maps_to_slot_taken() {
    let server = MockServer::start().await;
    mount_provider(&server).await;
    mount_empty(&server, "appointments").await;
    mount_empty(&server, "unavailability_blocks").await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"appointments_provider_slot_active_idx\""
        })))
        .mount(&server)
        .await;

    let result = engine_for(&server)
        .create_booking(ALICE, CARDIOLOGIST, tomorrow(), t(10, 0), None)
        .await;

    assert_matches!(result, Err(SchedulingError::SlotTaken));
}

#[tokio::test]
async fn test_client_slot_violation_maps_to_client_conflict() {
    let server = MockServer::start().await;
    mount_provider(&server).await;
    mount_empty(&server, "appointments").await;
    mount_empty(&server, "unavailability_blocks").await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"appointments_client_slot_active_idx\""
        })))
        .mount(&server)
        .await;

    let result = engine_for(&server)
        .create_booking(ALICE, CARDIOLOGIST, tomorrow(), t(10, 0), None)
        .await;

    assert_matches!(result, Err(SchedulingError::ClientConflict));
}

#[tokio::test]
async fn test_blocked_slot_trigger_maps_to_provider_unavailable() {
    let server = MockServer::start().await;
    mount_provider(&server).await;
    mount_empty(&server, "appointments").await;
    mount_empty(&server, "unavailability_blocks").await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "P0001",
            "message": "provider_unavailable"
        })))
        .mount(&server)
        .await;

    let result = engine_for(&server)
        .create_booking(ALICE, CARDIOLOGIST, tomorrow(), t(10, 0), None)
        .await;

    assert_matches!(result, Err(SchedulingError::ProviderUnavailable));
}

#[tokio::test]
async fn test_code_collision_on_insert_is_retried() {
    let server = MockServer::start().await;
    mount_provider(&server).await;
    mount_empty(&server, "appointments").await;
    mount_empty(&server, "unavailability_blocks").await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"appointments_appointment_code_key\""
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([appointment_row(43, "10:00:00")])))
        .expect(1)
        .mount(&server)
        .await;

    let appointment = engine_for(&server)
        .create_booking(ALICE, CARDIOLOGIST, tomorrow(), t(10, 0), None)
        .await
        .unwrap();

    assert_eq!(appointment.id, 43);
}

async fn mount_block_rpc(server: &MockServer, body: Value, message: &str) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/create_unavailability_block"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(body))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "P0001",
            "message": message
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_block_guard_maps_to_conflicting_appointments() {
    let server = MockServer::start().await;
    mount_empty(&server, "appointments").await;
    mount_empty(&server, "unavailability_blocks").await;
    mount_block_rpc(
        &server,
        json!({
            "p_provider_id": CARDIOLOGIST,
            "p_block_date": "2026-02-20",
            "p_is_full_day": false,
            "p_start_time": "13:00:00",
            "p_end_time": "14:00:00"
        }),
        "conflicting_appointments",
    )
    .await;

    let result = engine_for(&server)
        .create_block(CARDIOLOGIST, tomorrow(), BlockSpec::partial(t(13, 0), t(14, 0)), None)
        .await;

    assert_matches!(result, Err(SchedulingError::ConflictingAppointments));
}

#[tokio::test]
async fn test_block_guard_maps_to_duplicate_block() {
    let server = MockServer::start().await;
    mount_empty(&server, "appointments").await;
    mount_empty(&server, "unavailability_blocks").await;
    mount_block_rpc(&server, json!({ "p_is_full_day": true, "p_guard_bookings": false }), "duplicate_block").await;

    let result = engine_for(&server)
        .create_block(CARDIOLOGIST, tomorrow(), BlockSpec::full_day(), None)
        .await;

    assert_matches!(result, Err(SchedulingError::DuplicateBlock));
}

#[tokio::test]
async fn test_block_guard_maps_to_overlapping_block() {
    let server = MockServer::start().await;
    mount_empty(&server, "appointments").await;
    mount_empty(&server, "unavailability_blocks").await;
    mount_block_rpc(&server, json!({ "p_start_time": "12:30:00" }), "overlapping_block").await;

    let result = engine_for(&server)
        .create_block(CARDIOLOGIST, tomorrow(), BlockSpec::partial(t(12, 30), t(13, 30)), None)
        .await;

    assert_matches!(result, Err(SchedulingError::OverlappingBlock));
}

#[tokio::test]
async fn test_full_day_policy_is_sent_to_the_block_guard() {
    let server = MockServer::start().await;
    mount_empty(&server, "appointments").await;
    mount_empty(&server, "unavailability_blocks").await;
    mount_block_rpc(
        &server,
        json!({ "p_is_full_day": true, "p_guard_bookings": true, "p_start_time": null }),
        "conflicting_appointments",
    )
    .await;

    let scheduling = SchedulingConfig { full_day_block_rejects_bookings: true, ..SchedulingConfig::default() };
    let result = engine_with(&server, scheduling)
        .create_block(CARDIOLOGIST, tomorrow(), BlockSpec::full_day(), None)
        .await;

    assert_matches!(result, Err(SchedulingError::ConflictingAppointments));
}

#[tokio::test]
async fn test_availability_reads_one_day_snapshot() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/provider_day_snapshot"))
        .and(body_partial_json(json!({ "p_provider_id": CARDIOLOGIST, "p_date": "2026-02-20" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "appointments": [appointment_row(7, "10:00:00")],
            "blocks": [{
                "id": 3,
                "provider_id": CARDIOLOGIST,
                "block_date": "2026-02-20",
                "is_full_day": false,
                "start_time": "13:00:00",
                "end_time": "14:00:00",
                "reason": "Lunch",
                "created_at": "2026-02-19T08:00:00"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let view = engine_for(&server)
        .generate_availability(CARDIOLOGIST, tomorrow())
        .await
        .unwrap();

    assert_eq!(view.booked_count, 1);
    assert_eq!(view.available_count, 13);
    assert!(!view.available_times().contains(&t(10, 0)));
    assert!(!view.available_times().contains(&t(13, 30)));
}

#[tokio::test]
async fn test_specialization_is_matched_literally() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/providers"))
        .and(query_param("order", "full_name.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": CARDIOLOGIST, "full_name": "Dr. Amara Okafor", "specialization": "Cardiology" },
            { "id": DERMATOLOGIST, "full_name": "Dr. Lena Fischer", "specialization": "Dermatology" }
        ])))
        .mount(&server)
        .await;

    let engine = engine_for(&server);

    let found = engine.providers_by_specialization("CARDIOLOGY").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, CARDIOLOGIST);

    assert_matches!(
        engine.providers_by_specialization("%ology").await,
        Err(SchedulingError::NotFound(_))
    );
}

#[tokio::test]
async fn test_server_errors_are_retryable() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let error = engine_for(&server)
        .generate_availability(CARDIOLOGIST, tomorrow())
        .await
        .unwrap_err();

    assert_matches!(error, SchedulingError::StoreUnavailable(_));
    assert!(error.is_retryable());
}
