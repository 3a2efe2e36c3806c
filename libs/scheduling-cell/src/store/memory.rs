// libs/scheduling-cell/src/store/memory.rs
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::models::{
    Appointment, AppointmentChanges, AppointmentId, BlockId, ClientId, DateRange, NewAppointment,
    NewBlock, Provider, ProviderId, UnavailabilityBlock,
};
use crate::store::{LedgerGuard, LedgerStore, LedgerTx, ProviderDay, StoreError, UniqueConstraint};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    providers: BTreeMap<ProviderId, Provider>,
    appointments: BTreeMap<AppointmentId, Appointment>,
    blocks: BTreeMap<BlockId, UnavailabilityBlock>,
    last_appointment_id: AppointmentId,
    last_block_id: BlockId,
}

impl LedgerState {
    fn insert_appointment(&mut self, new: NewAppointment) -> Result<Appointment, StoreError> {
        let appointment = Appointment {
            id: self.last_appointment_id + 1,
            appointment_code: new.appointment_code,
            provider_id: new.provider_id,
            client_id: new.client_id,
            appointment_date: new.appointment_date,
            appointment_time: new.appointment_time,
            status: new.status,
            reason_for_visit: new.reason_for_visit,
            notes: None,
            created_at: new.created_at,
            updated_at: new.updated_at,
        };

        self.check_appointment(&appointment, None, true)?;

        self.last_appointment_id = appointment.id;
        self.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    /// Mirrors the unique indexes and the slot trigger of the SQL schema.
    fn check_appointment(
        &self,
        candidate: &Appointment,
        previous: Option<&Appointment>,
        check_code: bool,
    ) -> Result<(), StoreError> {
        let others = || {
            self.appointments
                .values()
                .filter(move |existing| existing.id != candidate.id)
        };

        if check_code && others().any(|existing| existing.appointment_code == candidate.appointment_code) {
            return Err(StoreError::UniqueViolation(UniqueConstraint::AppointmentCode));
        }

        if !candidate.status.is_active() {
            return Ok(());
        }

        let same_slot = |existing: &&Appointment| {
            existing.status.is_active()
                && existing.appointment_date == candidate.appointment_date
                && existing.appointment_time == candidate.appointment_time
        };

        if others().filter(same_slot).any(|existing| existing.provider_id == candidate.provider_id) {
            return Err(StoreError::UniqueViolation(UniqueConstraint::ProviderSlot));
        }
        if others().filter(same_slot).any(|existing| existing.client_id == candidate.client_id) {
            return Err(StoreError::UniqueViolation(UniqueConstraint::ClientSlot));
        }

        let slot_moved = previous.map_or(true, |previous| {
            previous.appointment_date != candidate.appointment_date
                || previous.appointment_time != candidate.appointment_time
                || !previous.status.is_active()
        });
        if slot_moved && self.slot_blocked(candidate.provider_id, candidate.appointment_date, candidate.appointment_time) {
            return Err(StoreError::GuardViolation(LedgerGuard::SlotBlocked));
        }

        Ok(())
    }

    /// Mirrors the block trigger of the SQL schema.
    fn check_block(&self, block: &NewBlock) -> Result<(), StoreError> {
        let same_day: Vec<&UnavailabilityBlock> = self
            .blocks
            .values()
            .filter(|existing| existing.provider_id == block.provider_id && existing.block_date == block.block_date)
            .collect();

        if same_day
            .iter()
            .any(|existing| existing.range.is_full_day() || existing.range == block.range)
        {
            return Err(StoreError::GuardViolation(LedgerGuard::DuplicateBlock));
        }
        if !block.range.is_full_day() && same_day.iter().any(|existing| existing.range.overlaps(&block.range)) {
            return Err(StoreError::GuardViolation(LedgerGuard::OverlappingBlock));
        }

        let covers_booking = self.appointments.values().any(|a| {
            a.provider_id == block.provider_id
                && a.status.is_active()
                && a.appointment_date == block.block_date
                && block.range.covers(a.appointment_time)
        });
        if block.guard_bookings && covers_booking {
            return Err(StoreError::GuardViolation(LedgerGuard::BlockOverBookings));
        }

        Ok(())
    }

    fn slot_blocked(&self, provider_id: ProviderId, date: NaiveDate, time: NaiveTime) -> bool {
        self.blocks.values().any(|block| {
            block.provider_id == provider_id && block.block_date == date && block.range.covers(time)
        })
    }
}

/// In-process ledger. Transactions are fully serialized behind one lock.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
    latency: Option<Duration>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every transaction start, to exercise caller timeouts.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn add_provider(&self, provider: Provider) {
        self.state.lock().await.providers.insert(provider.id, provider);
    }

    /// Writes a row directly, bypassing the booking rules but not the ledger constraints.
    pub async fn seed_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        self.state.lock().await.insert_appointment(appointment)
    }

    /// Writes a block directly, without checking existing appointments.
    pub async fn seed_block(&self, block: NewBlock) -> UnavailabilityBlock {
        let mut state = self.state.lock().await;
        state.last_block_id += 1;
        let block = block.into_block(state.last_block_id);
        state.blocks.insert(block.id, block.clone());
        block
    }

    pub async fn appointments(&self) -> Vec<Appointment> {
        self.state.lock().await.appointments.values().cloned().collect()
    }

    pub async fn blocks(&self) -> Vec<UnavailabilityBlock> {
        self.state.lock().await.blocks.values().cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn provider(&mut self, provider_id: ProviderId) -> Result<Option<Provider>, StoreError> {
        Ok(self.working.providers.get(&provider_id).cloned())
    }

    async fn providers(&mut self) -> Result<Vec<Provider>, StoreError> {
        let mut providers: Vec<Provider> = self.working.providers.values().cloned().collect();
        providers.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(providers)
    }

    async fn providers_by_specialization(
        &mut self,
        specialization: &str,
    ) -> Result<Vec<Provider>, StoreError> {
        let mut providers = self.providers().await?;
        providers.retain(|provider| provider.specialization.eq_ignore_ascii_case(specialization));
        Ok(providers)
    }

    async fn appointment(&mut self, appointment_id: AppointmentId) -> Result<Option<Appointment>, StoreError> {
        Ok(self.working.appointments.get(&appointment_id).cloned())
    }

    async fn provider_appointments(
        &mut self,
        provider_id: ProviderId,
        range: Option<DateRange>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut rows: Vec<Appointment> = self
            .working
            .appointments
            .values()
            .filter(|a| a.provider_id == provider_id)
            .filter(|a| range.map_or(true, |range| range.contains(a.appointment_date)))
            .cloned()
            .collect();
        rows.sort_by_key(|a| (a.appointment_date, a.appointment_time, a.id));
        Ok(rows)
    }

    async fn client_appointments(&mut self, client_id: ClientId) -> Result<Vec<Appointment>, StoreError> {
        let mut rows: Vec<Appointment> = self
            .working
            .appointments
            .values()
            .filter(|a| a.client_id == client_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.scheduled_at().cmp(&a.scheduled_at()).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn provider_appointments_at(
        &mut self,
        provider_id: ProviderId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Vec<Appointment>, StoreError> {
        Ok(self
            .working
            .appointments
            .values()
            .filter(|a| a.provider_id == provider_id && a.status.is_active())
            .filter(|a| a.appointment_date == date && a.appointment_time == time)
            .cloned()
            .collect())
    }

    async fn client_appointments_at(
        &mut self,
        client_id: ClientId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Vec<Appointment>, StoreError> {
        Ok(self
            .working
            .appointments
            .values()
            .filter(|a| a.client_id == client_id && a.status.is_active())
            .filter(|a| a.appointment_date == date && a.appointment_time == time)
            .cloned()
            .collect())
    }

    async fn code_exists(&mut self, code: &str) -> Result<bool, StoreError> {
        Ok(self.working.appointments.values().any(|a| a.appointment_code == code))
    }

    async fn insert_appointment(&mut self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        self.working.insert_appointment(appointment)
    }

    async fn update_appointment(
        &mut self,
        appointment_id: AppointmentId,
        changes: &AppointmentChanges,
    ) -> Result<Option<Appointment>, StoreError> {
        let Some(previous) = self.working.appointments.get(&appointment_id).cloned() else {
            return Ok(None);
        };

        let mut updated = previous.clone();
        changes.apply_to(&mut updated);
        self.working.check_appointment(&updated, Some(&previous), false)?;

        self.working.appointments.insert(appointment_id, updated.clone());
        Ok(Some(updated))
    }

    async fn provider_day(&mut self, provider_id: ProviderId, date: NaiveDate) -> Result<ProviderDay, StoreError> {
        let appointments = self
            .provider_appointments(provider_id, Some(DateRange { from: date, to: date }))
            .await?;
        let blocks = self.blocks_on(provider_id, date).await?;
        Ok(ProviderDay { appointments, blocks })
    }

    async fn blocks_on(
        &mut self,
        provider_id: ProviderId,
        date: NaiveDate,
    ) -> Result<Vec<UnavailabilityBlock>, StoreError> {
        let mut blocks = self.blocks_from(provider_id, date).await?;
        blocks.retain(|block| block.block_date == date);
        Ok(blocks)
    }

    async fn blocks_from(
        &mut self,
        provider_id: ProviderId,
        from: NaiveDate,
    ) -> Result<Vec<UnavailabilityBlock>, StoreError> {
        let mut blocks: Vec<UnavailabilityBlock> = self
            .working
            .blocks
            .values()
            .filter(|block| block.provider_id == provider_id && block.block_date >= from)
            .cloned()
            .collect();
        blocks.sort_by_key(|block| (block.block_date, block.range.start(), block.id));
        Ok(blocks)
    }

    async fn insert_block(&mut self, block: NewBlock) -> Result<UnavailabilityBlock, StoreError> {
        self.working.check_block(&block)?;

        self.working.last_block_id += 1;
        let block = block.into_block(self.working.last_block_id);
        self.working.blocks.insert(block.id, block.clone());
        Ok(block)
    }

    async fn delete_block(&mut self, provider_id: ProviderId, block_id: BlockId) -> Result<u64, StoreError> {
        let owned = self
            .working
            .blocks
            .get(&block_id)
            .is_some_and(|block| block.provider_id == provider_id);

        if owned {
            self.working.blocks.remove(&block_id);
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        debug!("Memory ledger transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
