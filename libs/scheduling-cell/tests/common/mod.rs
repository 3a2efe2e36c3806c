// libs/scheduling-cell/tests/common/mod.rs
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use scheduling_cell::models::{AppointmentStatus, NewAppointment, Provider};
use scheduling_cell::{FixedClock, MemoryLedger, SchedulingEngine};
use shared_config::SchedulingConfig;

pub const CARDIOLOGIST: i64 = 1;
pub const DERMATOLOGIST: i64 = 2;
pub const SECOND_CARDIOLOGIST: i64 = 3;

pub const ALICE: i64 = 100;
pub const BOB: i64 = 101;
pub const CAROL: i64 = 102;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Thursday 2026-02-19, 08:00 clinic time.
pub fn now() -> NaiveDateTime {
    today().and_time(t(8, 0))
}

pub fn today() -> NaiveDate {
    d(2026, 2, 19)
}

pub fn tomorrow() -> NaiveDate {
    d(2026, 2, 20)
}

pub fn yesterday() -> NaiveDate {
    d(2026, 2, 18)
}

pub struct Harness {
    pub engine: Arc<SchedulingEngine>,
    pub ledger: MemoryLedger,
}

pub async fn harness() -> Harness {
    harness_with(SchedulingConfig::default()).await
}

pub async fn harness_with(config: SchedulingConfig) -> Harness {
    harness_on(MemoryLedger::new(), config).await
}

pub async fn harness_on(ledger: MemoryLedger, config: SchedulingConfig) -> Harness {
    seed_providers(&ledger).await;

    let engine = SchedulingEngine::new(&config, Arc::new(ledger.clone()), Arc::new(FixedClock(now())))
        .expect("default clinic hours form a valid lattice");

    Harness { engine: Arc::new(engine), ledger }
}

pub async fn seed_providers(ledger: &MemoryLedger) {
    for (id, name, specialization) in [
        (CARDIOLOGIST, "Dr. Amara Okafor", "Cardiology"),
        (DERMATOLOGIST, "Dr. Lena Fischer", "Dermatology"),
        (SECOND_CARDIOLOGIST, "Dr. Ben Carter", "Cardiology"),
    ] {
        ledger
            .add_provider(Provider {
                id,
                full_name: name.to_string(),
                specialization: specialization.to_string(),
            })
            .await;
    }
}

/// A ledger row written directly, e.g. history the booking rules would not accept today.
pub fn row(
    code: &str,
    provider_id: i64,
    client_id: i64,
    date: NaiveDate,
    time: NaiveTime,
    status: AppointmentStatus,
    reason: Option<&str>,
) -> NewAppointment {
    NewAppointment {
        appointment_code: code.to_string(),
        provider_id,
        client_id,
        appointment_date: date,
        appointment_time: time,
        status,
        reason_for_visit: reason.map(str::to_string),
        created_at: now(),
        updated_at: now(),
    }
}
