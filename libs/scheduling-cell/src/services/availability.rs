// libs/scheduling-cell/src/services/availability.rs
use chrono::NaiveDate;
use tracing::debug;

use crate::error::SchedulingError;
use crate::models::{
    Appointment, AvailabilityView, BlockRange, ProviderId, SlotView, UnavailabilityBlock,
};
use crate::services::lattice::SlotLattice;
use crate::store::LedgerTx;

pub const FULL_DAY_MESSAGE: &str = "Provider is not available on this day";

/// Turns a provider's bookings and blocks for one date into a free/busy view.
#[derive(Debug, Clone)]
pub struct AvailabilityResolver {
    lattice: SlotLattice,
}

impl AvailabilityResolver {
    pub fn new(lattice: SlotLattice) -> Self {
        Self { lattice }
    }

    pub async fn resolve(
        &self,
        tx: &mut dyn LedgerTx,
        provider_id: ProviderId,
        date: NaiveDate,
    ) -> Result<AvailabilityView, SchedulingError> {
        debug!("Resolving availability for provider {} on {}", provider_id, date);

        let day = tx.provider_day(provider_id, date).await?;
        Ok(build_view(provider_id, date, &self.lattice, &day.appointments, &day.blocks))
    }
}

fn unavailable_view(provider_id: ProviderId, date: NaiveDate) -> AvailabilityView {
    AvailabilityView {
        provider_id,
        date,
        available: false,
        slots: Vec::new(),
        total_slots: 0,
        available_count: 0,
        booked_count: 0,
        message: Some(FULL_DAY_MESSAGE.to_string()),
    }
}

/// Pure resolution over one day's rows. A full-day block overrides everything else.
pub fn build_view(
    provider_id: ProviderId,
    date: NaiveDate,
    lattice: &SlotLattice,
    appointments: &[Appointment],
    blocks: &[UnavailabilityBlock],
) -> AvailabilityView {
    let blocks: Vec<&UnavailabilityBlock> = blocks
        .iter()
        .filter(|block| block.provider_id == provider_id && block.block_date == date)
        .collect();

    if blocks.iter().any(|block| block.range == BlockRange::FullDay) {
        return unavailable_view(provider_id, date);
    }

    let active: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| a.provider_id == provider_id && a.appointment_date == date && a.status.is_active())
        .collect();

    let slots: Vec<SlotView> = lattice
        .slots()
        .into_iter()
        .map(|time| {
            let booked = active.iter().any(|a| a.appointment_time == time);
            let blocked = blocks.iter().any(|block| block.range.covers(time));
            SlotView { time, is_available: !booked && !blocked }
        })
        .collect();

    let available_count = slots.iter().filter(|slot| slot.is_available).count();

    AvailabilityView {
        provider_id,
        date,
        available: true,
        total_slots: slots.len(),
        available_count,
        booked_count: active.len(),
        slots,
        message: None,
    }
}
