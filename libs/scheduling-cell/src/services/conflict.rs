// libs/scheduling-cell/src/services/conflict.rs
use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, warn};

use crate::error::SchedulingError;
use crate::models::{AppointmentId, ClientId, ProviderId};
use crate::store::LedgerTx;

/// A slot a client wants to occupy, optionally on behalf of an existing booking.
#[derive(Debug, Clone, Copy)]
pub struct SlotCandidate {
    pub provider_id: ProviderId,
    pub client_id: ClientId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub exclude_appointment_id: Option<AppointmentId>,
}

/// Validates a prospective booking against the ledger. Returns the first failing rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector;

impl ConflictDetector {
    pub fn new() -> Self {
        Self
    }

    pub async fn check(
        &self,
        tx: &mut dyn LedgerTx,
        candidate: &SlotCandidate,
        today: NaiveDate,
    ) -> Result<(), SchedulingError> {
        debug!(
            "Checking conflicts for provider {} client {} at {} {}",
            candidate.provider_id, candidate.client_id, candidate.date, candidate.time
        );

        if candidate.date < today {
            return Err(SchedulingError::PastDate);
        }

        let not_excluded = |id: AppointmentId| Some(id) != candidate.exclude_appointment_id;

        let occupying = tx
            .provider_appointments_at(candidate.provider_id, candidate.date, candidate.time)
            .await?;
        if occupying.iter().any(|a| a.status.is_active() && not_excluded(a.id)) {
            warn!(
                "Slot {} {} already taken for provider {}",
                candidate.date, candidate.time, candidate.provider_id
            );
            return Err(SchedulingError::SlotTaken);
        }

        let blocks = tx.blocks_on(candidate.provider_id, candidate.date).await?;
        if blocks.iter().any(|block| block.range.covers(candidate.time)) {
            warn!(
                "Provider {} is blocked at {} {}",
                candidate.provider_id, candidate.date, candidate.time
            );
            return Err(SchedulingError::ProviderUnavailable);
        }

        let held = tx
            .client_appointments_at(candidate.client_id, candidate.date, candidate.time)
            .await?;
        if held.iter().any(|a| a.status.is_active() && not_excluded(a.id)) {
            warn!(
                "Client {} already holds an appointment at {} {}",
                candidate.client_id, candidate.date, candidate.time
            );
            return Err(SchedulingError::ClientConflict);
        }

        Ok(())
    }
}
