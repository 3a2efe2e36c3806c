// libs/scheduling-cell/src/services/blocks.rs
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::error::SchedulingError;
use crate::models::{
    BlockId, BlockRange, BlockSpec, DateRange, NewBlock, ProviderId, UnavailabilityBlock,
};
use crate::store::LedgerTx;

/// Provider-declared unavailability.
#[derive(Debug, Clone, Copy)]
pub struct BlockManager {
    full_day_rejects_bookings: bool,
}

impl BlockManager {
    pub fn new(full_day_rejects_bookings: bool) -> Self {
        Self { full_day_rejects_bookings }
    }

    /// Validates a requested range: a partial block needs both bounds with `start < end`.
    pub fn resolve_range(spec: &BlockSpec) -> Result<BlockRange, SchedulingError> {
        if spec.is_full_day {
            return Ok(BlockRange::FullDay);
        }

        match (spec.start_time, spec.end_time) {
            (Some(start), Some(end)) if start < end => Ok(BlockRange::Partial { start, end }),
            (Some(_), Some(_)) => Err(SchedulingError::MalformedRange(
                "start time must be before end time".to_string(),
            )),
            _ => Err(SchedulingError::MalformedRange(
                "start and end time are required for a partial block".to_string(),
            )),
        }
    }

    pub async fn create(
        &self,
        tx: &mut dyn LedgerTx,
        provider_id: ProviderId,
        date: NaiveDate,
        spec: BlockSpec,
        reason: Option<String>,
        now: NaiveDateTime,
    ) -> Result<UnavailabilityBlock, SchedulingError> {
        debug!("Creating block for provider {} on {}", provider_id, date);

        if date < now.date() {
            return Err(SchedulingError::PastDate);
        }

        let range = Self::resolve_range(&spec)?;

        let existing = tx.blocks_on(provider_id, date).await?;
        if existing
            .iter()
            .any(|block| block.range.is_full_day() || block.range == range)
        {
            warn!("Provider {} already has this time blocked on {}", provider_id, date);
            return Err(SchedulingError::DuplicateBlock);
        }
        if !range.is_full_day() && existing.iter().any(|block| block.range.overlaps(&range)) {
            warn!("Block for provider {} on {} overlaps an existing block", provider_id, date);
            return Err(SchedulingError::OverlappingBlock);
        }

        let guard_bookings = !range.is_full_day() || self.full_day_rejects_bookings;
        if guard_bookings {
            let covered = tx
                .provider_appointments(provider_id, Some(DateRange { from: date, to: date }))
                .await?
                .into_iter()
                .filter(|a| a.status.is_active() && range.covers(a.appointment_time))
                .count();

            if covered > 0 {
                warn!(
                    "Block for provider {} on {} would cover {} active appointment(s)",
                    provider_id, date, covered
                );
                return Err(SchedulingError::ConflictingAppointments);
            }
        }

        let block = tx
            .insert_block(NewBlock {
                provider_id,
                block_date: date,
                range,
                reason,
                created_at: now,
                guard_bookings,
            })
            .await?;

        info!("Created block {} for provider {} on {}", block.id, provider_id, date);
        Ok(block)
    }

    pub async fn delete(
        &self,
        tx: &mut dyn LedgerTx,
        provider_id: ProviderId,
        block_id: BlockId,
    ) -> Result<(), SchedulingError> {
        let removed = tx.delete_block(provider_id, block_id).await?;
        if removed == 0 {
            return Err(SchedulingError::not_found("Blocked time"));
        }

        info!("Removed block {} for provider {}", block_id, provider_id);
        Ok(())
    }

    pub async fn list_upcoming(
        &self,
        tx: &mut dyn LedgerTx,
        provider_id: ProviderId,
        today: NaiveDate,
    ) -> Result<Vec<UnavailabilityBlock>, SchedulingError> {
        Ok(tx.blocks_from(provider_id, today).await?)
    }
}
