// libs/scheduling-cell/tests/availability_test.rs
mod common;

use assert_matches::assert_matches;

use common::*;
use scheduling_cell::models::{AppointmentStatus, BlockSpec};
use scheduling_cell::SchedulingError;

#[tokio::test]
async fn test_open_day_lists_every_slot_as_free() {
    let h = harness().await;

    let view = h.engine.generate_availability(CARDIOLOGIST, tomorrow()).await.unwrap();

    assert!(view.available);
    assert_eq!(view.total_slots, 16);
    assert_eq!(view.slots.len(), 16);
    assert_eq!(view.available_count, 16);
    assert_eq!(view.booked_count, 0);
    assert_eq!(view.slots.first().unwrap().time, t(9, 0));
    assert_eq!(view.slots.last().unwrap().time, t(16, 30));
    assert!(view.message.is_none());
}

#[tokio::test]
async fn test_booked_slot_is_marked_unavailable() {
    let h = harness().await;
    h.engine
        .create_booking(ALICE, CARDIOLOGIST, tomorrow(), t(10, 0), None)
        .await
        .unwrap();

    let view = h.engine.generate_availability(CARDIOLOGIST, tomorrow()).await.unwrap();

    assert_eq!(view.available_count, 15);
    assert_eq!(view.booked_count, 1);
    assert!(!view.available_times().contains(&t(10, 0)));
    assert!(view.available_times().contains(&t(10, 30)));
}

#[tokio::test]
async fn test_cancelled_rows_do_not_occupy_slots() {
    let h = harness().await;
    h.ledger
        .seed_appointment(row("APT-000001-001", CARDIOLOGIST, ALICE, tomorrow(), t(11, 0), AppointmentStatus::Cancelled, None))
        .await
        .unwrap();

    let view = h.engine.generate_availability(CARDIOLOGIST, tomorrow()).await.unwrap();

    assert_eq!(view.available_count, 16);
    assert_eq!(view.booked_count, 0);
}

#[tokio::test]
async fn test_partial_block_hides_covered_slots_only() {
    let h = harness().await;
    h.engine
        .create_block(CARDIOLOGIST, tomorrow(), BlockSpec::partial(t(13, 0), t(14, 0)), Some("Lunch".into()))
        .await
        .unwrap();

    let view = h.engine.generate_availability(CARDIOLOGIST, tomorrow()).await.unwrap();
    let free = view.available_times();

    assert!(view.available);
    assert_eq!(view.available_count, 14);
    assert!(!free.contains(&t(13, 0)));
    assert!(!free.contains(&t(13, 30)));
    assert!(free.contains(&t(12, 30)));
    assert!(free.contains(&t(14, 0)), "block end is exclusive");
}

#[tokio::test]
async fn test_full_day_block_closes_the_day() {
    let h = harness().await;
    h.engine
        .create_block(CARDIOLOGIST, tomorrow(), BlockSpec::full_day(), Some("Conference".into()))
        .await
        .unwrap();

    let view = h.engine.generate_availability(CARDIOLOGIST, tomorrow()).await.unwrap();

    assert!(!view.available);
    assert!(view.slots.is_empty());
    assert_eq!(view.total_slots, 0);
    assert_eq!(view.message.as_deref(), Some("Provider is not available on this day"));
}

#[tokio::test]
async fn test_blocks_are_scoped_to_their_provider() {
    let h = harness().await;
    h.engine
        .create_block(CARDIOLOGIST, tomorrow(), BlockSpec::full_day(), None)
        .await
        .unwrap();

    let view = h.engine.generate_availability(DERMATOLOGIST, tomorrow()).await.unwrap();

    assert!(view.available);
    assert_eq!(view.available_count, 16);
}

#[tokio::test]
async fn test_client_availability_rejects_past_dates_and_unknown_providers() {
    let h = harness().await;

    assert_matches!(
        h.engine.client_availability(CARDIOLOGIST, yesterday()).await,
        Err(SchedulingError::PastDate)
    );
    assert_matches!(
        h.engine.client_availability(999, tomorrow()).await,
        Err(SchedulingError::NotFound(_))
    );

    let view = h.engine.client_availability(CARDIOLOGIST, today()).await.unwrap();
    assert_eq!(view.total_slots, 16);
}

#[tokio::test]
async fn test_provider_can_inspect_past_days() {
    let h = harness().await;
    h.ledger
        .seed_appointment(row("APT-000002-002", CARDIOLOGIST, BOB, yesterday(), t(9, 0), AppointmentStatus::Completed, None))
        .await
        .unwrap();

    let view = h.engine.generate_availability(CARDIOLOGIST, yesterday()).await.unwrap();

    assert_eq!(view.booked_count, 1);
    assert_eq!(view.available_count, 15);
}
